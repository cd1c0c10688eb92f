//! 终端输出：进度行与汇总表

use anyhow::{Context, Result};
use common::{HarvestMode, HarvestProgress, HarvestSummary};
use std::path::Path;
use tabled::{Table, settings::Style};

/// 每前进多少个百分点输出一次进度
pub const PROGRESS_STEP: f64 = 10.0;

pub fn progress_line(progress: &HarvestProgress) -> String {
    format!(
        "Progress {:>5.1}% | saved {} | skipped {} | failed {}",
        progress.percent, progress.saved, progress.skipped, progress.failed
    )
}

/// 只在进度跨过新的档位或计数变化时返回要输出的行
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last: Option<(u64, usize, usize, usize)>,
}

impl ProgressTracker {
    pub fn update(&mut self, progress: &HarvestProgress) -> Option<String> {
        let bucket = (progress.percent / PROGRESS_STEP).floor().max(0.0) as u64;
        let key = (bucket, progress.saved, progress.skipped, progress.failed);
        if self.last == Some(key) {
            return None;
        }
        self.last = Some(key);
        Some(progress_line(progress))
    }
}

pub fn summary_table(summary: &HarvestSummary) -> String {
    let mut rows = vec![
        vec!["Mode".to_string(), summary.mode.to_string()],
        vec!["Status".to_string(), summary.status.to_string()],
        vec!["Saved".to_string(), summary.saved.to_string()],
    ];
    if summary.mode == HarvestMode::Deep {
        rows.push(vec!["Skipped".to_string(), summary.skipped.to_string()]);
    }
    rows.push(vec!["Errors".to_string(), summary.failed.to_string()]);
    rows.push(vec![
        "Folder".to_string(),
        summary.output_dir.display().to_string(),
    ]);

    let mut table = Table::from_iter(rows);
    table.with(Style::rounded());
    table.to_string()
}

pub async fn write_summary_json(path: &Path, summary: &HarvestSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    log::info!("Summary written to {}", path.display());
    Ok(())
}
