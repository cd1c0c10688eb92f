//! 详情页大图解析
//!
//! 按优先级依次尝试：预览元数据 → 页面上任意 `srcset` → 任意 `src`。
//! 元数据可能异步渲染，只对它等待；等待超时不算错误，继续尝试下一级。

use common::RenderSurface;
use std::time::Duration;
use url::Url;

use crate::descriptor::pick_largest_from_srcset;
use crate::error::{ItemError, UnavailableReason};

pub const PREVIEW_META_SELECTOR: &str = "meta[property='og:image']";
pub const SRCSET_IMAGE_SELECTOR: &str = "img[srcset]";
pub const SRC_IMAGE_SELECTOR: &str = "img[src]";

const VIDEO_EXTENSIONS: [&str; 2] = [".mp4", ".m3u8"];

fn http_url(value: Option<String>) -> Option<String> {
    value.filter(|v| v.starts_with("http"))
}

/// 判断URL是否指向视频容器
pub fn is_video_url(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_ascii_lowercase(),
        Err(_) => url.to_ascii_lowercase(),
    };
    VIDEO_EXTENSIONS.iter().any(|ext| path.contains(ext))
}

async fn preview_meta<S: RenderSurface>(
    surface: &S,
    wait: Duration,
) -> Result<Option<String>, ItemError> {
    if !surface.wait_for_selector(PREVIEW_META_SELECTOR, wait).await? {
        let timeout = ItemError::ResolutionTimeout {
            selector: PREVIEW_META_SELECTOR.to_string(),
            waited: wait,
        };
        log::debug!("{}, falling back", timeout);
        return Ok(None);
    }
    for meta in surface.query_selector_all(PREVIEW_META_SELECTOR).await? {
        if let Some(url) = http_url(surface.attribute(&meta, "content").await?) {
            return Ok(Some(url));
        }
    }
    Ok(None)
}

async fn largest_srcset<S: RenderSurface>(surface: &S) -> Result<Option<String>, ItemError> {
    for image in surface.query_selector_all(SRCSET_IMAGE_SELECTOR).await? {
        let srcset = surface.attribute(&image, "srcset").await?.unwrap_or_default();
        if let Some(url) = http_url(pick_largest_from_srcset(&srcset)) {
            return Ok(Some(url));
        }
    }
    Ok(None)
}

async fn first_src<S: RenderSurface>(surface: &S) -> Result<Option<String>, ItemError> {
    for image in surface.query_selector_all(SRC_IMAGE_SELECTOR).await? {
        if let Some(url) = http_url(surface.attribute(&image, "src").await?) {
            return Ok(Some(url));
        }
    }
    Ok(None)
}

/// 按优先级查找当前页面上最好的图片地址，单级查询出错时记录并尝试下一级
pub async fn best_image_on_page<S: RenderSurface>(surface: &S, meta_wait: Duration) -> Option<String> {
    match preview_meta(surface, meta_wait).await {
        Ok(Some(url)) => return Some(url),
        Ok(None) => {}
        Err(e) => log::debug!("Preview metadata lookup failed: {}", e),
    }
    match largest_srcset(surface).await {
        Ok(Some(url)) => return Some(url),
        Ok(None) => {}
        Err(e) => log::debug!("srcset lookup failed: {}", e),
    }
    match first_src(surface).await {
        Ok(url) => url,
        Err(e) => {
            log::debug!("src lookup failed: {}", e);
            None
        }
    }
}

/// 在活动上下文中打开详情页并解析出可下载的图片地址
///
/// 视频或无图返回 [`ItemError::ContentUnavailable`]，调用方计为跳过。
pub async fn resolve_detail_image<S: RenderSurface>(
    surface: &S,
    permalink: &str,
    meta_wait: Duration,
) -> Result<String, ItemError> {
    surface
        .navigate(permalink)
        .await
        .map_err(|e| ItemError::Navigation(format!("{}: {}", permalink, e)))?;

    match best_image_on_page(surface, meta_wait).await {
        Some(url) if is_video_url(&url) => {
            Err(ItemError::ContentUnavailable(UnavailableReason::Video(url)))
        }
        Some(url) => Ok(url),
        None => Err(ItemError::ContentUnavailable(UnavailableReason::NoImage)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_video_url() {
        let test_cases = vec![
            ("https://v.pinimg.com/videos/hls/abc.m3u8", true),
            ("https://v.pinimg.com/videos/720p/abc.MP4?x=1", true),
            ("foo.m3u8", true),
            ("https://i.pinimg.com/originals/ab/cd/ef.jpg", false),
            ("https://i.pinimg.com/x.jpg?note=.mp4", false),
        ];
        for (url, expected) in test_cases {
            assert_eq!(is_video_url(url), expected, "url: {}", url);
        }
    }
}
