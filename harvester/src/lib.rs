//! 懒加载信息流采集核心
//!
//! 按滚动步骤逐步发现信息流中的条目，并在发现的同时把每个唯一条目保存到本地一次。
//! 两种模式共用同一套滚动控制与编排流程：
//!
//! - 浅层模式：直接下载网格中的缩略图
//! - 深层模式：在独立上下文中打开详情页获取大图
//!
//! 核心只依赖 [`common::RenderSurface`]，浏览器与离线页面的实现位于 `surface/` 下。

use common::RenderSurface;
use std::sync::Arc;

pub mod bootstrap;
pub mod cancel;
pub mod config;
pub mod descriptor;
pub mod detail;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod harvest;
pub mod identity;
pub mod pacing;
pub mod registry;
pub mod report;
pub mod scroll;
pub mod strategy;
pub mod viewport;

pub use cancel::CancelToken;
pub use config::HarvestConfig;
pub use error::{HarvestError, HarvestResult, ItemError, UnavailableReason};
pub use fetcher::{FetchOutcome, HttpFetcher, MediaFetcher};
pub use harvest::{HarvestHandle, Harvester};
pub use pacing::{FixedJitter, Jitter, UniformJitter};
pub use registry::DedupRegistry;
pub use report::{HarvestReporter, LogReporter};
pub use scroll::{ScrollController, ScrollPhase, ScrollSettings, ScrollState};

/// 以默认的HTTP下载器开始采集
///
/// 采集在独立任务中运行，返回的句柄用于读取进度、请求取消与等待结果。
pub fn start_harvest<S: RenderSurface + 'static>(
    surface: Arc<S>,
    config: HarvestConfig,
    reporter: Arc<dyn HarvestReporter>,
) -> HarvestResult<HarvestHandle> {
    config.validate()?;
    let fetcher = HttpFetcher::new(&config.referer, config.request_timeout())
        .map_err(|e| HarvestError::Config(format!("failed to build HTTP client: {}", e)))?;
    Ok(Harvester::new(surface, fetcher, config)
        .with_reporter(reporter)
        .spawn())
}
