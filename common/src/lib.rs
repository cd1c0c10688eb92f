//! 共用工具函数库
//!
//! 这个模块包含了整个workspace中可能用到的通用工具函数、共享模型，
//! 以及核心与浏览器之间的渲染面接口 [`RenderSurface`]。
use anyhow::Result;
use human_bytes::human_bytes;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use url::Url;

pub mod download;
pub mod models;
pub mod surface;
pub use download::*;
pub use models::*;
pub use surface::*;

pub const GENERAL_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
/// 图片源拒绝没有 Referer 的请求
pub const FEED_REFERER: &str = "https://www.pinterest.com/";
pub const MAX_FILENAME_LENGTH: usize = 180;
/// 没有任何可用名字时的文件名主干
pub const FALLBACK_STEM: &str = "image";

/// 使用url库安全地拼接URL，避免斜杠重复
pub fn join_url(base: &str, path: &str) -> Result<String> {
    let base_url = Url::parse(base)?;
    let joined = base_url.join(path)?;
    Ok(joined.to_string())
}

/// 将字节数转换为人类可读的格式
pub fn convert_bytes<T: Into<f64>>(bytes: T) -> String {
    human_bytes(bytes.into())
}

// ==== 文件名 ====

static IMAGE_EXT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(jpe?g|png|webp)$").unwrap());
static UNSAFE_CHARS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.\-]+").unwrap());

/// 替换不安全字符并截断到 [`MAX_FILENAME_LENGTH`] 个字符
pub fn safe_filename(name: &str) -> String {
    UNSAFE_CHARS_REGEX
        .replace_all(name, "_")
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .collect()
}

/// 取URL路径的最后一段，解析失败时退回到手动切分
fn last_path_segment(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    path.rsplit('/').next().unwrap_or_default().to_string()
}

/// 从URL推导保存用的文件名
///
/// - 路径最后一段为空时使用 `<id>.jpg`（没有id时为 `image.jpg`）
/// - 扩展名不是 jpg/jpeg/png/webp 时替换或追加 `.jpg`
/// - 最后做安全字符替换与截断
pub fn filename_from_url(url: &str, id: Option<&str>) -> String {
    let fallback = id.filter(|s| !s.is_empty()).unwrap_or(FALLBACK_STEM);
    let mut base = last_path_segment(url);

    if base.is_empty() {
        base = format!("{}.jpg", fallback);
    }

    if !IMAGE_EXT_REGEX.is_match(&base) {
        let stem = Path::new(&base)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback)
            .to_string();
        base = format!("{}.jpg", stem);
    }

    safe_filename(&base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let test_cases = vec![
            (
                "https://www.pinterest.com/user/board/",
                "/pin/123/",
                "https://www.pinterest.com/pin/123/",
            ),
            (
                "https://www.pinterest.com/user/board/",
                "https://www.pinterest.com/pin/456/",
                "https://www.pinterest.com/pin/456/",
            ),
            (
                "https://www.pinterest.com",
                "pin/789/",
                "https://www.pinterest.com/pin/789/",
            ),
        ];

        for (base, path, expected) in test_cases {
            let result = join_url(base, path).unwrap();
            assert_eq!(result, expected);
            println!("✓ Base: {} + Path: {} = {}", base, path, result);
        }
    }

    #[test]
    fn test_filename_from_url() {
        let test_cases = vec![
            // 正常图片
            (
                "https://i.pinimg.com/736x/ab/cd/ef/abcdef.jpg",
                Some("1"),
                "abcdef.jpg",
            ),
            ("https://i.pinimg.com/originals/x/y.PNG", None, "y.PNG"),
            ("https://i.pinimg.com/a/b.webp?x=1", Some("9"), "b.webp"),
            // 扩展名不被识别时替换为 .jpg
            ("https://i.pinimg.com/a/anim.gif", Some("2"), "anim.jpg"),
            ("https://i.pinimg.com/a/noext", Some("3"), "noext.jpg"),
            // 路径为空时使用 id
            ("https://i.pinimg.com/", Some("42"), "42.jpg"),
            ("https://i.pinimg.com/", None, "image.jpg"),
            // 不安全字符
            ("https://i.pinimg.com/a/b%20c.jpg", None, "b_20c.jpg"),
        ];

        for (url, id, expected) in test_cases {
            let name = filename_from_url(url, id);
            assert_eq!(name, expected, "url: {}", url);
            println!("✓ {} -> {}", url, name);
        }
    }

    #[test]
    fn test_safe_filename_truncates() {
        let long = format!("{}.jpg", "a".repeat(300));
        let name = safe_filename(&long);
        assert_eq!(name.chars().count(), MAX_FILENAME_LENGTH);
        assert!(name.chars().all(|c| c == 'a'));

        assert_eq!(safe_filename("a b??c.jpg"), "a_b_c.jpg");
        assert_eq!(safe_filename("ok-name_1.png"), "ok-name_1.png");
    }

    #[test]
    fn test_convert_bytes() {
        assert!(!convert_bytes(2048_f64).is_empty());
    }
}
