//! 两种采集模式的差异部分
//!
//! 编排器与滚动控制器对两种模式共用，策略只决定：
//! 视口中如何发现新条目、每个条目如何得到下载地址、何时登记去重。

use async_trait::async_trait;
use common::{HarvestMode, RenderSurface};
use std::time::Duration;

use crate::detail::resolve_detail_image;
use crate::error::{HarvestResult, ItemError};
use crate::extract::{collect_new_links, collect_new_thumbnails};
use crate::identity::extract_item_id;
use crate::registry::DedupRegistry;
use crate::viewport;

/// 本轮发现的待处理条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// 条目id，用于文件名回退
    pub id: Option<String>,
    /// 浅层模式为图片地址，深层模式为详情页链接
    pub target: String,
    /// 本次采集中第一次出现；重试的条目为 `false`
    pub fresh: bool,
}

/// 单个条目的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 得到可下载的图片地址
    Resolved(String),
    /// 条目本身出错，计为失败
    Failed(ItemError),
}

#[async_trait]
pub trait HarvestStrategy<S: RenderSurface>: Send {
    fn mode(&self) -> HarvestMode;

    /// 主循环开始前调用一次
    async fn prepare(&mut self, surface: &S) -> HarvestResult<()>;

    /// 返回当前视口中的新条目
    async fn discover(&mut self, surface: &S) -> Vec<Candidate>;

    /// 解析条目的下载地址
    ///
    /// 只有让主循环无法继续的错误才通过 `Err` 返回。
    async fn resolve(&mut self, surface: &S, candidate: &Candidate) -> HarvestResult<Resolution>;

    /// 条目下载成功
    fn record_saved(&mut self, candidate: &Candidate);

    /// 主循环结束后调用，无论正常结束、取消还是出错
    async fn release(&mut self, surface: &S);
}

/// 浅层模式：直接下载信息流中的缩略图
///
/// 条目id只在下载成功后登记，失败的条目会在后续轮次中再次尝试。
/// 重试不算新发现，不会让滚动控制器的空闲计数清零。
#[derive(Debug, Default)]
pub struct ThumbnailStrategy {
    registry: DedupRegistry,
    attempted: DedupRegistry,
}

impl ThumbnailStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &DedupRegistry {
        &self.registry
    }
}

#[async_trait]
impl<S: RenderSurface> HarvestStrategy<S> for ThumbnailStrategy {
    fn mode(&self) -> HarvestMode {
        HarvestMode::Shallow
    }

    async fn prepare(&mut self, _surface: &S) -> HarvestResult<()> {
        Ok(())
    }

    async fn discover(&mut self, surface: &S) -> Vec<Candidate> {
        collect_new_thumbnails(surface, &self.registry)
            .await
            .into_iter()
            .map(|thumb| Candidate {
                fresh: self.attempted.add(thumb.id.clone()),
                id: Some(thumb.id),
                target: thumb.url,
            })
            .collect()
    }

    async fn resolve(&mut self, _surface: &S, candidate: &Candidate) -> HarvestResult<Resolution> {
        Ok(Resolution::Resolved(candidate.target.clone()))
    }

    fn record_saved(&mut self, candidate: &Candidate) {
        if let Some(id) = &candidate.id {
            self.registry.add(id.clone());
        }
    }

    async fn release(&mut self, _surface: &S) {}
}

/// 深层模式：在独立上下文中打开每个条目的详情页
///
/// 链接在发现时立即登记，之后不会再次访问，无论下载结果如何。
/// 每个条目处理完都切回主上下文，切换失败时结束本次采集。
pub struct PinPageStrategy<S: RenderSurface> {
    seen: DedupRegistry,
    meta_wait: Duration,
    primary: Option<S::Context>,
    secondary: Option<S::Context>,
}

impl<S: RenderSurface> PinPageStrategy<S> {
    pub fn new(meta_wait: Duration) -> Self {
        Self {
            seen: DedupRegistry::new(),
            meta_wait,
            primary: None,
            secondary: None,
        }
    }

    pub fn seen(&self) -> &DedupRegistry {
        &self.seen
    }

    async fn return_to_primary(&self, surface: &S) -> HarvestResult<()> {
        if let Some(primary) = &self.primary {
            surface.switch_to(primary).await?;
        }
        Ok(())
    }

    /// 切回后信息流位置变了就滚回去，滚动控制器依赖自己记录的位置
    async fn restore_feed_offset(&self, surface: &S, offset: f64) -> HarvestResult<()> {
        let current = viewport::scroll_offset(surface).await?;
        if (current - offset).abs() > 1.0 {
            log::debug!("Feed moved from {} to {} while away, scrolling back", offset, current);
            viewport::scroll_to(surface, offset).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<S: RenderSurface> HarvestStrategy<S> for PinPageStrategy<S> {
    fn mode(&self) -> HarvestMode {
        HarvestMode::Deep
    }

    async fn prepare(&mut self, surface: &S) -> HarvestResult<()> {
        let primary = surface.current_context().await?;
        self.primary = Some(primary.clone());
        let secondary = surface.open_secondary_context().await?;
        log::debug!("Opened worker context {:?}", secondary);
        self.secondary = Some(secondary);
        surface.switch_to(&primary).await?;
        Ok(())
    }

    async fn discover(&mut self, surface: &S) -> Vec<Candidate> {
        collect_new_links(surface, &mut self.seen)
            .await
            .into_iter()
            .map(|link| Candidate {
                id: extract_item_id(&link),
                target: link,
                fresh: true,
            })
            .collect()
    }

    async fn resolve(&mut self, surface: &S, candidate: &Candidate) -> HarvestResult<Resolution> {
        let Some(secondary) = &self.secondary else {
            return Ok(Resolution::Failed(ItemError::Navigation(
                "worker context is not open".to_string(),
            )));
        };

        let feed_offset = viewport::scroll_offset(surface).await?;
        let resolution = match surface.switch_to(secondary).await {
            Ok(()) => match resolve_detail_image(surface, &candidate.target, self.meta_wait).await {
                Ok(url) => Resolution::Resolved(url),
                Err(e) => Resolution::Failed(e),
            },
            Err(e) => Resolution::Failed(e.into()),
        };

        self.return_to_primary(surface).await?;
        self.restore_feed_offset(surface, feed_offset).await?;
        Ok(resolution)
    }

    fn record_saved(&mut self, _candidate: &Candidate) {}

    async fn release(&mut self, surface: &S) {
        if let Some(secondary) = self.secondary.take() {
            if let Err(e) = surface.close_context(&secondary).await {
                log::warn!("Failed to close worker context: {}", e);
            }
        }
        if let Err(e) = self.return_to_primary(surface).await {
            log::warn!("Failed to return to the feed context: {}", e);
        }
    }
}
