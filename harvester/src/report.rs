use common::{HarvestProgress, HarvestSummary};

/// 采集过程通知
///
/// 回调在采集工作者上同步调用，实现应当尽快返回。
pub trait HarvestReporter: Send + Sync {
    fn on_log(&self, line: &str) {
        log::info!("{}", line);
    }

    fn on_progress(&self, _progress: &HarvestProgress) {}

    fn on_complete(&self, _summary: &HarvestSummary) {}
}

/// 只写日志的默认实现
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl HarvestReporter for LogReporter {
    fn on_progress(&self, progress: &HarvestProgress) {
        log::debug!(
            "Progress {:.1}% (saved={}, skipped={}, failed={})",
            progress.percent,
            progress.saved,
            progress.skipped,
            progress.failed
        );
    }
}
