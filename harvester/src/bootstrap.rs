//! 打开信息流并确认条目已经渲染
//!
//! 在开始采集之前由调用方使用，失败只影响提示，不阻止采集开始。

use common::{RenderSurface, SurfaceResult, script};
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use crate::identity::{ITEM_IMAGE_SELECTOR, ITEM_LINK_SELECTOR};
use crate::viewport;

/// 常见的同意与关闭按钮
pub const OVERLAY_SELECTORS: [&str; 3] = [
    "button[aria-label*='Accept']",
    "button[aria-label*='Close']",
    "[data-test-id='close-button']",
];

pub const FEED_READY_TIMEOUT: Duration = Duration::from_secs(20);
pub const RELOAD_WAIT: Duration = Duration::from_secs(12);
const NUDGE_PX: f64 = 400.0;
const POLL_INTERVAL: Duration = Duration::from_millis(250);

static BOARD_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://([a-z]+\.)?pinterest\.[a-z]+/.+/.+/?$").unwrap()
});

/// 检查是否为看板地址
pub fn is_valid_board_url(url: &str) -> bool {
    BOARD_URL_REGEX.is_match(url.trim())
}

async fn has_items<S: RenderSurface>(surface: &S) -> bool {
    surface
        .query_selector_all(ITEM_IMAGE_SELECTOR)
        .await
        .map(|items| !items.is_empty())
        .unwrap_or(false)
}

async fn feed_opened<S: RenderSurface>(surface: &S) -> bool {
    let links = surface
        .query_selector_all(ITEM_LINK_SELECTOR)
        .await
        .map(|v| !v.is_empty())
        .unwrap_or(false);
    links
        || surface
            .current_url()
            .await
            .map(|u| u.contains("board"))
            .unwrap_or(false)
}

async fn sleep_until_next_poll(deadline: Instant) -> bool {
    let now = Instant::now();
    if now >= deadline {
        return false;
    }
    tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    true
}

/// 打开信息流地址，等待条目链接出现或地址中出现 `board`
pub async fn open_feed<S: RenderSurface>(surface: &S, url: &str, wait: Duration) -> SurfaceResult<bool> {
    log::info!("Navigating to board: {}", url);
    surface.navigate(url).await?;
    let deadline = Instant::now() + wait;
    loop {
        if feed_opened(surface).await {
            return Ok(true);
        }
        if !sleep_until_next_poll(deadline).await {
            return Ok(false);
        }
    }
}

/// 确认信息流中已经有条目
///
/// 反复关闭遮罩并上下轻推页面，超时后重新加载一次再等待。
pub async fn ensure_feed_ready<S: RenderSurface>(surface: &S, timeout: Duration) -> SurfaceResult<bool> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if has_items(surface).await {
            return Ok(true);
        }
        for selector in OVERLAY_SELECTORS {
            match surface
                .execute_script(script::DISMISS_OVERLAY, vec![json!(selector)])
                .await
            {
                Ok(clicked) if clicked.as_bool() == Some(true) => {
                    log::debug!("Dismissed overlay {}", selector)
                }
                Ok(_) => {}
                Err(e) => log::debug!("Overlay check failed for {}: {}", selector, e),
            }
        }

        viewport::scroll_by(surface, NUDGE_PX).await?;
        tokio::time::sleep(Duration::from_millis(400)).await;
        viewport::scroll_by(surface, -NUDGE_PX).await?;
        tokio::time::sleep(Duration::from_millis(600)).await;
        if has_items(surface).await {
            return Ok(true);
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    log::info!("Items not visible yet, reloading once...");
    let url = surface.current_url().await?;
    surface.navigate(&url).await?;
    let deadline = Instant::now() + RELOAD_WAIT;
    loop {
        if has_items(surface).await {
            return Ok(true);
        }
        if !sleep_until_next_poll(deadline).await {
            return Ok(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_board_url() {
        let test_cases = vec![
            ("https://www.pinterest.com/someone/cats/", true),
            ("https://pinterest.co.uk/someone/cats", false),
            ("http://in.pinterest.com/a/b", true),
            ("  https://www.Pinterest.COM/a/b/  ", true),
            ("https://www.pinterest.com/someone/", false),
            ("https://example.com/a/b/", false),
            ("pinterest.com/a/b", false),
        ];
        for (url, expected) in test_cases {
            assert_eq!(is_valid_board_url(url), expected, "url: {}", url);
        }
    }
}
