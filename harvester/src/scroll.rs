//! 滚动与增长控制
//!
//! 状态机：`Advancing` 逐步向下滚动并记录文档增长；
//! `AtBottom` 在底部等待新内容，有增长时回拉一下再回到 `Advancing`，
//! 连续 `idle_threshold` 次没有增长则进入 `Done`。
//!
//! 控制器本身不检查取消，停顿被取消打断后直接返回，
//! 由编排器在下一次迭代开始时退出。

use common::{RenderSurface, SurfaceResult};
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::config::HarvestConfig;
use crate::pacing::{self, Jitter};
use crate::viewport;

/// 距底部多少像素以内视为到达底部
pub const BOTTOM_TOLERANCE_PX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPhase {
    Advancing,
    AtBottom,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollState {
    pub offset: f64,
    pub document_height: f64,
    pub idle_cycles: u32,
}

/// 控制器使用的参数，从 [`HarvestConfig`] 中取出
#[derive(Debug, Clone, Copy)]
pub struct ScrollSettings {
    pub idle_threshold: u32,
    pub scroll_step: f64,
    pub pause_min: Duration,
    pub pause_max: Duration,
    pub settle: Duration,
    pub nudge_px: f64,
    pub nudge_pause: Duration,
}

impl From<&HarvestConfig> for ScrollSettings {
    fn from(config: &HarvestConfig) -> Self {
        let (pause_min, pause_max) = config.pause_bounds();
        Self {
            idle_threshold: config.idle_threshold.max(1),
            scroll_step: config.scroll_step,
            pause_min,
            pause_max,
            settle: config.settle(),
            nudge_px: config.nudge_px,
            nudge_pause: config.nudge_pause(),
        }
    }
}

pub struct ScrollController<'a, S: RenderSurface> {
    surface: &'a S,
    jitter: &'a dyn Jitter,
    cancel: &'a CancelToken,
    settings: ScrollSettings,
    viewport_height: f64,
    step_px: f64,
    phase: ScrollPhase,
    state: ScrollState,
    growth_events: usize,
}

impl<'a, S: RenderSurface> ScrollController<'a, S> {
    /// 回到顶部并测量视口与文档高度
    pub async fn start(
        surface: &'a S,
        settings: ScrollSettings,
        jitter: &'a dyn Jitter,
        cancel: &'a CancelToken,
    ) -> SurfaceResult<Self> {
        viewport::scroll_to(surface, 0.0).await?;
        pacing::sleep_unless_cancelled(cancel, settings.settle).await;

        let viewport_height = viewport::viewport_height(surface).await?;
        let step_px = (viewport_height * settings.scroll_step).floor().max(1.0);
        let document_height = viewport::document_height(surface).await?;
        log::debug!(
            "Scroll controller ready: viewport={}px step={}px height={}px",
            viewport_height,
            step_px,
            document_height
        );

        Ok(Self {
            surface,
            jitter,
            cancel,
            settings,
            viewport_height,
            step_px,
            phase: ScrollPhase::Advancing,
            state: ScrollState {
                offset: 0.0,
                document_height,
                idle_cycles: 0,
            },
            growth_events: 0,
        })
    }

    pub fn phase(&self) -> ScrollPhase {
        self.phase
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    pub fn step_px(&self) -> f64 {
        self.step_px
    }

    /// 观察到的文档增长次数
    pub fn growth_events(&self) -> usize {
        self.growth_events
    }

    /// 本轮发现了新条目，空闲计数清零
    pub fn note_discovery(&mut self) {
        self.state.idle_cycles = 0;
    }

    /// 按已走过的文档比例估算进度，范围 `[0, 100]`
    pub fn progress(&self) -> f64 {
        let height = self.state.document_height.max(1.0);
        (self.state.offset / height * 100.0).clamp(0.0, 100.0)
    }

    async fn jitter_pause(&self) -> bool {
        pacing::pause(
            self.jitter,
            self.cancel,
            self.settings.pause_min,
            self.settings.pause_max,
        )
        .await
    }

    fn record_height(&mut self, height: f64) -> bool {
        if height > self.state.document_height {
            log::debug!(
                "Document grew {}px -> {}px",
                self.state.document_height,
                height
            );
            self.state.document_height = height;
            self.state.idle_cycles = 0;
            self.growth_events += 1;
            true
        } else {
            false
        }
    }

    fn bottom_offset(&self, height: f64) -> f64 {
        (height - self.viewport_height).max(0.0)
    }

    /// 推进一步，返回推进后的阶段
    pub async fn step(&mut self) -> SurfaceResult<ScrollPhase> {
        if self.phase == ScrollPhase::Done {
            return Ok(ScrollPhase::Done);
        }

        let page_height = viewport::document_height(self.surface).await?;
        self.record_height(page_height);
        let at_bottom =
            self.state.offset + self.viewport_height >= page_height - BOTTOM_TOLERANCE_PX;

        if at_bottom {
            self.phase = ScrollPhase::AtBottom;
            self.wait_at_bottom(page_height).await?;
        } else {
            self.phase = ScrollPhase::Advancing;
            self.advance(page_height).await?;
        }
        Ok(self.phase)
    }

    async fn wait_at_bottom(&mut self, page_height: f64) -> SurfaceResult<()> {
        if !self.jitter_pause().await {
            return Ok(());
        }

        let new_height = viewport::document_height(self.surface).await?;
        if new_height > page_height {
            self.record_height(new_height);
            // 先向上回拉再滚到新的底部，触发依赖可见区域的懒加载
            viewport::scroll_by(self.surface, -self.settings.nudge_px).await?;
            pacing::sleep_unless_cancelled(self.cancel, self.settings.nudge_pause).await;
            let bottom = self.bottom_offset(new_height);
            viewport::scroll_to(self.surface, bottom).await?;
            self.state.offset = bottom;
            self.state.idle_cycles = 0;
            self.phase = ScrollPhase::Advancing;
            return Ok(());
        }

        self.state.idle_cycles += 1;
        log::debug!(
            "No growth at bottom ({}/{})",
            self.state.idle_cycles,
            self.settings.idle_threshold
        );
        if self.state.idle_cycles >= self.settings.idle_threshold {
            self.phase = ScrollPhase::Done;
        }
        Ok(())
    }

    async fn advance(&mut self, page_height: f64) -> SurfaceResult<()> {
        let bottom = self.bottom_offset(page_height);
        let mut next = self.state.offset + self.step_px;
        if next >= bottom {
            next = bottom;
            self.phase = ScrollPhase::AtBottom;
        }

        viewport::scroll_to(self.surface, next).await?;
        self.state.offset = next;
        if !self.jitter_pause().await {
            return Ok(());
        }

        let new_height = viewport::document_height(self.surface).await?;
        self.record_height(new_height);

        let height = self.state.document_height;
        if self.state.offset + self.viewport_height >= height - BOTTOM_TOLERANCE_PX {
            let bottom = self.bottom_offset(height);
            viewport::scroll_to(self.surface, bottom).await?;
            self.state.offset = bottom;
            self.phase = ScrollPhase::AtBottom;
            self.jitter_pause().await;
        } else {
            self.phase = ScrollPhase::Advancing;
        }
        Ok(())
    }
}
