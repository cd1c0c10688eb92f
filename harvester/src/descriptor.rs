//! 响应式图片描述解析（`srcset`）

/// 无法解析宽度的条目使用的宽度
const UNPARSED_WIDTH: i64 = -1;

/// 解析单个 `"url 736w"` 条目，宽度缺失或不是 `<数字>w` 时为 [`UNPARSED_WIDTH`]
fn parse_candidate(part: &str) -> Option<(&str, i64)> {
    let mut pieces = part.split_whitespace();
    let url = pieces.next()?;
    let width = pieces
        .next()
        .and_then(|w| w.strip_suffix('w'))
        .and_then(|w| w.parse::<i64>().ok())
        .unwrap_or(UNPARSED_WIDTH);
    Some((url, width))
}

/// 从 `srcset` 中选出宽度最大的URL
///
/// 宽度相同时保留先出现的条目；没有任何条目带有可解析的宽度时返回 `None`。
pub fn pick_largest_from_srcset(srcset: &str) -> Option<String> {
    let mut best: Option<&str> = None;
    let mut best_width = UNPARSED_WIDTH;

    for (url, width) in srcset
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(parse_candidate)
    {
        if width > best_width {
            best = Some(url);
            best_width = width;
        }
    }

    best.map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_largest() {
        let test_cases = vec![
            ("a.jpg 100w, b.jpg 400w, c.jpg 50w", Some("b.jpg")),
            ("https://i.pinimg.com/236x/x.jpg 236w", Some("https://i.pinimg.com/236x/x.jpg")),
            // 宽度相同保留先出现的
            ("a.jpg 300w, b.jpg 300w", Some("a.jpg")),
            // 有效宽度总是胜过无法解析的宽度
            ("a.jpg 2x, b.jpg 10w, c.jpg", Some("b.jpg")),
            ("a.jpg abcw, b.jpg 0w", Some("b.jpg")),
            // 多余空白与空条目
            ("  a.jpg   120w ,, b.jpg 121w  ", Some("b.jpg")),
        ];

        for (srcset, expected) in test_cases {
            let picked = pick_largest_from_srcset(srcset);
            assert_eq!(picked.as_deref(), expected, "srcset: {}", srcset);
            println!("✓ {} -> {:?}", srcset, picked);
        }
    }

    #[test]
    fn test_unparsable_or_empty() {
        assert_eq!(pick_largest_from_srcset(""), None);
        assert_eq!(pick_largest_from_srcset("   "), None);
        assert_eq!(pick_largest_from_srcset(",,,"), None);
        assert_eq!(pick_largest_from_srcset("a.jpg"), None);
        assert_eq!(pick_largest_from_srcset("a.jpg 1x, b.jpg 2x"), None);
        assert_eq!(pick_largest_from_srcset("a.jpg w, b.jpg 12"), None);
    }
}
