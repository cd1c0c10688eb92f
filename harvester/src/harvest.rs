//! 采集编排
//!
//! 一个工作者顺序驱动渲染面：发现新条目 → 逐个解析并下载 → 滚动一步，
//! 直到滚动控制器结束或观察到取消。展示层只通过 [`HarvestHandle`] 读取进度与请求取消。

use common::{
    HarvestMode, HarvestProgress, HarvestStatus, HarvestSummary, ItemOutcome, RenderSurface,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cancel::CancelToken;
use crate::config::HarvestConfig;
use crate::error::{HarvestResult, ItemError};
use crate::fetcher::{FetchOutcome, MediaFetcher};
use crate::identity::ITEM_LINK_SELECTOR;
use crate::pacing::{Jitter, UniformJitter};
use crate::report::{HarvestReporter, LogReporter};
use crate::scroll::{ScrollController, ScrollPhase, ScrollSettings};
use crate::strategy::{Candidate, HarvestStrategy, PinPageStrategy, Resolution, ThumbnailStrategy};

pub struct Harvester<S: RenderSurface, F: MediaFetcher> {
    surface: Arc<S>,
    fetcher: F,
    config: HarvestConfig,
    reporter: Arc<dyn HarvestReporter>,
    jitter: Arc<dyn Jitter>,
    cancel: CancelToken,
    progress: watch::Sender<HarvestProgress>,
}

impl<S: RenderSurface, F: MediaFetcher> Harvester<S, F> {
    pub fn new(surface: Arc<S>, fetcher: F, config: HarvestConfig) -> Self {
        let (progress, _) = watch::channel(HarvestProgress::default());
        Self {
            surface,
            fetcher,
            config,
            reporter: Arc::new(LogReporter),
            jitter: Arc::new(UniformJitter),
            cancel: CancelToken::new(),
            progress,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn HarvestReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_jitter(mut self, jitter: Arc<dyn Jitter>) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// 订阅进度快照
    pub fn subscribe(&self) -> watch::Receiver<HarvestProgress> {
        self.progress.subscribe()
    }

    fn log(&self, line: impl AsRef<str>) {
        self.reporter.on_log(line.as_ref());
    }

    fn publish(&self, percent: f64, summary: &HarvestSummary) {
        let snapshot = HarvestProgress {
            percent: percent.clamp(0.0, 100.0),
            saved: summary.saved,
            skipped: summary.skipped,
            failed: summary.failed,
        };
        self.reporter.on_progress(&snapshot);
        self.progress.send_replace(snapshot);
    }

    /// 执行一次完整采集
    ///
    /// 不返回错误：无法恢复的错误会记录日志并以 [`HarvestStatus::Aborted`] 结束，计数保留。
    pub async fn run(self) -> HarvestSummary {
        let mut summary = HarvestSummary::new(self.config.mode, self.config.output_dir.clone());

        let status = match self.execute(&mut summary).await {
            Ok(status) => status,
            Err(e) => {
                log::error!("Harvest aborted: {}", e);
                self.log(format!("Fatal error: {}", e));
                HarvestStatus::Aborted(e.to_string())
            }
        };
        summary.status = status;

        if summary.status == HarvestStatus::Completed {
            self.publish(100.0, &summary);
        } else {
            let percent = self.progress.borrow().percent;
            self.publish(percent, &summary);
        }
        for line in summary.to_lines() {
            self.log(line);
        }
        self.reporter.on_complete(&summary);
        summary
    }

    async fn execute(&self, summary: &mut HarvestSummary) -> HarvestResult<HarvestStatus> {
        self.config.validate()?;
        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        self.log(format!(
            "Starting {} harvest into {}",
            self.config.mode,
            self.config.output_dir.display()
        ));
        self.publish(0.0, summary);

        match self.config.mode {
            HarvestMode::Shallow => self.drive(ThumbnailStrategy::new(), summary).await,
            HarvestMode::Deep => {
                self.drive(PinPageStrategy::<S>::new(self.config.detail_wait()), summary)
                    .await
            }
        }
    }

    async fn drive<St: HarvestStrategy<S>>(
        &self,
        mut strategy: St,
        summary: &mut HarvestSummary,
    ) -> HarvestResult<HarvestStatus> {
        if self.cancel.is_cancelled() {
            return Ok(HarvestStatus::Cancelled);
        }
        log::debug!("Running {} strategy", strategy.mode());
        self.wait_for_items().await;

        let outcome = match strategy.prepare(&*self.surface).await {
            Ok(()) => self.harvest_loop(&mut strategy, summary).await,
            Err(e) => Err(e),
        };
        strategy.release(&*self.surface).await;
        outcome
    }

    /// 等待条目链接出现，超时也继续
    async fn wait_for_items(&self) {
        let wait = self
            .surface
            .wait_for_selector(ITEM_LINK_SELECTOR, self.config.feed_wait());
        let visible = tokio::select! {
            result = wait => result.unwrap_or(false),
            _ = self.cancel.cancelled() => return,
        };
        if !visible {
            self.log("Items not visible yet, starting scroll loop anyway.");
        }
    }

    async fn harvest_loop<St: HarvestStrategy<S>>(
        &self,
        strategy: &mut St,
        summary: &mut HarvestSummary,
    ) -> HarvestResult<HarvestStatus> {
        let surface = &*self.surface;
        let settings = ScrollSettings::from(&self.config);
        let mut controller =
            ScrollController::start(surface, settings, &*self.jitter, &self.cancel).await?;

        loop {
            if self.cancel.is_cancelled() {
                self.log("Cancelled.");
                return Ok(HarvestStatus::Cancelled);
            }

            let candidates = strategy.discover(surface).await;
            let fresh = candidates.iter().filter(|c| c.fresh).count();
            if fresh > 0 {
                controller.note_discovery();
                self.log(format!("Found {} new items in view", fresh));
            }

            for candidate in &candidates {
                if self.cancel.is_cancelled() {
                    break;
                }
                let outcome = self.process(strategy, candidate, summary).await?;
                // 重试再次失败不重复计数
                if candidate.fresh || outcome != ItemOutcome::Failed {
                    summary.record(outcome);
                }
                self.publish(controller.progress(), summary);
            }
            if self.cancel.is_cancelled() {
                continue;
            }

            let phase = controller.step().await?;
            self.publish(controller.progress(), summary);
            if phase == ScrollPhase::Done {
                log::debug!(
                    "Reached the end after {} growth events",
                    controller.growth_events()
                );
                return Ok(HarvestStatus::Completed);
            }
        }
    }

    async fn process<St: HarvestStrategy<S>>(
        &self,
        strategy: &mut St,
        candidate: &Candidate,
        summary: &HarvestSummary,
    ) -> HarvestResult<ItemOutcome> {
        let url = match strategy.resolve(&*self.surface, candidate).await? {
            Resolution::Resolved(url) => url,
            Resolution::Failed(ItemError::ContentUnavailable(reason)) => {
                self.log(format!("Skipped ({}) - {}", reason, candidate.target));
                return Ok(ItemOutcome::Skipped);
            }
            Resolution::Failed(e) => {
                self.log(format!("Error: {} - {}", e, candidate.target));
                return Ok(ItemOutcome::Failed);
            }
        };

        let id = candidate.id.as_deref();
        match self.fetcher.fetch(&url, &self.config.output_dir, id).await {
            FetchOutcome::Saved(_) | FetchOutcome::AlreadyPresent(_) => {
                strategy.record_saved(candidate);
                self.log(format!("Saved ✓  (total={})", summary.saved + 1));
                Ok(ItemOutcome::Downloaded)
            }
            FetchOutcome::Failed(reason) => {
                let e = ItemError::Fetch(reason);
                log::debug!("{}", e);
                self.log(format!("Download failed ✗ (item {})", id.unwrap_or("?")));
                Ok(ItemOutcome::Failed)
            }
        }
    }
}

impl<S, F> Harvester<S, F>
where
    S: RenderSurface + 'static,
    F: MediaFetcher + 'static,
{
    /// 在独立任务中运行采集
    pub fn spawn(self) -> HarvestHandle {
        let cancel = self.cancel.clone();
        let progress = self.progress.subscribe();
        let mode = self.config.mode;
        let output_dir = self.config.output_dir.clone();
        HarvestHandle {
            cancel,
            progress,
            mode,
            output_dir,
            task: Some(tokio::spawn(self.run())),
        }
    }
}

/// 运行中的采集
pub struct HarvestHandle {
    cancel: CancelToken,
    progress: watch::Receiver<HarvestProgress>,
    mode: HarvestMode,
    output_dir: PathBuf,
    task: Option<JoinHandle<HarvestSummary>>,
}

impl HarvestHandle {
    /// 请求取消，工作者在下一个检查点退出
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// 最新的进度快照
    pub fn progress(&self) -> HarvestProgress {
        self.progress.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<HarvestProgress> {
        self.progress.clone()
    }

    /// 等待采集结束
    pub async fn join(mut self) -> HarvestSummary {
        let Some(task) = self.task.take() else {
            return self.aborted("harvest task already joined");
        };
        match task.await {
            Ok(summary) => summary,
            Err(e) => {
                log::error!("Harvest task failed: {}", e);
                self.aborted(&e.to_string())
            }
        }
    }

    fn aborted(&self, reason: &str) -> HarvestSummary {
        let last = self.progress.borrow().clone();
        HarvestSummary {
            status: HarvestStatus::Aborted(reason.to_string()),
            saved: last.saved,
            skipped: last.skipped,
            failed: last.failed,
            ..HarvestSummary::new(self.mode, self.output_dir.clone())
        }
    }
}
