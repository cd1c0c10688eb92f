use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// 采集模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HarvestMode {
    /// 直接读取信息流网格中的缩略图（快）
    #[default]
    Shallow,
    /// 在独立上下文中打开每个条目的详情页获取大图
    Deep,
}

impl HarvestMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Shallow => "shallow",
            Self::Deep => "deep",
        }
    }
}

impl fmt::Display for HarvestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HarvestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shallow" | "thumbnails" | "thumbs" => Ok(Self::Shallow),
            "deep" | "pin-pages" | "pin_pages" | "pages" => Ok(Self::Deep),
            other => Err(format!(
                "unknown harvest mode '{}', expected shallow|deep",
                other
            )),
        }
    }
}

/// 单个条目的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemOutcome {
    Pending,
    Downloaded,
    /// 视频或没有可用图片，不算失败
    Skipped,
    Failed,
}

/// 一次采集的终止原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum HarvestStatus {
    /// 滚动控制器到达 DONE
    Completed,
    /// 用户请求取消
    Cancelled,
    /// 主循环中出现了无法恢复的错误，计数为截至当时的部分结果
    Aborted(String),
}

impl fmt::Display for HarvestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

/// 采集进行中发布给展示层的进度快照
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HarvestProgress {
    /// 文档遍历进度，0..=100
    pub percent: f64,
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// 采集结束后的汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarvestSummary {
    pub mode: HarvestMode,
    pub status: HarvestStatus,
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
    pub output_dir: PathBuf,
}

impl HarvestSummary {
    pub fn new(mode: HarvestMode, output_dir: PathBuf) -> Self {
        Self {
            mode,
            status: HarvestStatus::Completed,
            saved: 0,
            skipped: 0,
            failed: 0,
            output_dir,
        }
    }

    /// 记录一个条目的最终结果
    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Downloaded => self.saved += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Failed => self.failed += 1,
            ItemOutcome::Pending => {}
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == HarvestStatus::Cancelled
    }

    /// 多行文本形式的汇总，供日志输出
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("=== Summary ({} mode, {}) ===", self.mode, self.status),
            format!("Saved   : {}", self.saved),
        ];
        if self.mode == HarvestMode::Deep {
            lines.push(format!("Skipped : {}", self.skipped));
        }
        lines.push(format!("Errors  : {}", self.failed));
        lines.push(format!("Folder  : {}", self.output_dir.display()));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_str() {
        assert_eq!("shallow".parse::<HarvestMode>(), Ok(HarvestMode::Shallow));
        assert_eq!("Thumbnails".parse::<HarvestMode>(), Ok(HarvestMode::Shallow));
        assert_eq!("deep".parse::<HarvestMode>(), Ok(HarvestMode::Deep));
        assert_eq!("pin_pages".parse::<HarvestMode>(), Ok(HarvestMode::Deep));
        assert!("video".parse::<HarvestMode>().is_err());
    }

    #[test]
    fn test_summary_record() {
        let mut summary = HarvestSummary::new(HarvestMode::Deep, PathBuf::from("out"));
        summary.record(ItemOutcome::Downloaded);
        summary.record(ItemOutcome::Downloaded);
        summary.record(ItemOutcome::Skipped);
        summary.record(ItemOutcome::Failed);
        summary.record(ItemOutcome::Pending);

        assert_eq!(summary.saved, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert!(summary.to_lines().iter().any(|l| l.starts_with("Skipped")));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&HarvestStatus::Aborted("boom".into())).unwrap();
        assert_eq!(json, r#"{"status":"aborted","reason":"boom"}"#);
        let json = serde_json::to_string(&HarvestStatus::Cancelled).unwrap();
        assert_eq!(json, r#"{"status":"cancelled"}"#);
    }
}
