//! 从当前视口中提取新条目
//!
//! 单个元素出错只跳过该元素，查询本身失败时本轮返回空结果。

use common::{RenderSurface, join_url};

use crate::descriptor::pick_largest_from_srcset;
use crate::error::ItemError;
use crate::identity::{ITEM_IMAGE_SELECTOR, ITEM_LINK_SELECTOR, ITEM_PATH_MARKER, extract_item_id};
use crate::registry::DedupRegistry;

/// 缩略图地址的候选属性，按优先级排列；`srcset` 先于这些属性
pub const THUMBNAIL_SOURCE_ATTRIBUTES: [&str; 3] = ["src", "data-src", "data-pin-media"];

/// 信息流中的一个缩略图条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub id: String,
    pub url: String,
}

fn usable_url(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| v.starts_with("http"))
}

async fn thumbnail_url<S: RenderSurface>(
    surface: &S,
    image: &S::Element,
) -> Result<Option<String>, ItemError> {
    if let Some(srcset) = surface.attribute(image, "srcset").await? {
        if let Some(url) = usable_url(pick_largest_from_srcset(&srcset)) {
            return Ok(Some(url));
        }
    }
    for name in THUMBNAIL_SOURCE_ATTRIBUTES {
        if let Some(url) = usable_url(surface.attribute(image, name).await?) {
            return Ok(Some(url));
        }
    }
    Ok(None)
}

async fn read_thumbnail<S: RenderSurface>(
    surface: &S,
    image: &S::Element,
) -> Result<Option<Thumbnail>, ItemError> {
    let href = surface
        .closest_attribute(image, ITEM_LINK_SELECTOR, "href")
        .await?
        .ok_or_else(|| ItemError::Extraction("image has no enclosing item link".to_string()))?;
    let Some(id) = extract_item_id(&href) else {
        log::debug!("No item id in link: {}", href);
        return Ok(None);
    };
    let Some(url) = thumbnail_url(surface, image).await? else {
        log::debug!("No usable image source for item {}", id);
        return Ok(None);
    };
    Ok(Some(Thumbnail { id, url }))
}

/// 收集视口中未登记过的缩略图
///
/// 不修改登记表：缩略图只在下载成功后登记，失败的条目在后续轮次中还会出现。
pub async fn collect_new_thumbnails<S: RenderSurface>(
    surface: &S,
    registry: &DedupRegistry,
) -> Vec<Thumbnail> {
    let images = match surface.query_selector_all(ITEM_IMAGE_SELECTOR).await {
        Ok(images) => images,
        Err(e) => {
            log::warn!("Thumbnail query failed: {}", e);
            return Vec::new();
        }
    };

    let mut pass = DedupRegistry::new();
    let mut found = Vec::new();
    for image in &images {
        match read_thumbnail(surface, image).await {
            Ok(Some(thumb)) => {
                if registry.contains(&thumb.id) || !pass.add(thumb.id.clone()) {
                    continue;
                }
                found.push(thumb);
            }
            Ok(None) => {}
            Err(e) => log::debug!("Skipping element: {}", e),
        }
    }
    found
}

/// 收集视口中未见过的条目链接，并立即登记到 `seen`
///
/// 链接按当前页面地址转为绝对地址后作为去重键。
pub async fn collect_new_links<S: RenderSurface>(
    surface: &S,
    seen: &mut DedupRegistry,
) -> Vec<String> {
    let anchors = match surface.query_selector_all(ITEM_LINK_SELECTOR).await {
        Ok(anchors) => anchors,
        Err(e) => {
            log::warn!("Link query failed: {}", e);
            return Vec::new();
        }
    };
    let base = surface.current_url().await.ok();

    let mut links = Vec::new();
    for anchor in &anchors {
        let href = match surface.attribute(anchor, "href").await {
            Ok(Some(href)) if !href.trim().is_empty() => href,
            Ok(_) => continue,
            Err(e) => {
                log::debug!("Skipping element: {}", e);
                continue;
            }
        };
        let link = match base.as_deref() {
            Some(base) => join_url(base, href.trim()).unwrap_or_else(|_| href.trim().to_string()),
            None => href.trim().to_string(),
        };
        if link.contains(ITEM_PATH_MARKER) && seen.add(link.clone()) {
            links.push(link);
        }
    }
    links
}
