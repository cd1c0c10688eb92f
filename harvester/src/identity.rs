use regex::Regex;
use std::sync::LazyLock;

/// 匹配包含条目链接的锚点
pub const ITEM_LINK_SELECTOR: &str = "a[href*='/pin/']";
/// 匹配条目链接内的图片
pub const ITEM_IMAGE_SELECTOR: &str = "a[href*='/pin/'] img";
/// 条目链接必须包含的路径标记
pub const ITEM_PATH_MARKER: &str = "/pin/";

static ITEM_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/pin/(\d+)/?").unwrap());

/// 从条目链接中提取数字id
pub fn extract_item_id(href: &str) -> Option<String> {
    ITEM_ID_REGEX
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_item_id() {
        let test_cases = vec![
            ("https://www.pinterest.com/pin/123456789/", Some("123456789")),
            ("https://www.pinterest.com/pin/42", Some("42")),
            ("/pin/7/?mt=login", Some("7")),
            ("https://pinterest.co.uk/pin/99/sent/", Some("99")),
            ("https://www.pinterest.com/pin/abc/", None),
            ("https://www.pinterest.com/someone/board/", None),
            ("https://www.pinterest.com/pins/123/", None),
            ("", None),
        ];

        for (href, expected) in test_cases {
            assert_eq!(extract_item_id(href).as_deref(), expected, "href: {}", href);
        }
    }
}
