//! 采集配置
//!
//! 所有可调参数在开始采集时显式传入，不使用全局可变状态。

use common::{FEED_REFERER, HarvestMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{HarvestError, HarvestResult};

pub const DEFAULT_OUTPUT_DIR: &str = "pinterest_downloads";
pub const DEFAULT_IDLE_THRESHOLD: u32 = 2;
pub const DEFAULT_SCROLL_STEP: f64 = 0.7;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: f64 = 5.0;
pub const DEFAULT_PAUSE_MIN_SECS: f64 = 0.6;
pub const DEFAULT_PAUSE_MAX_SECS: f64 = 4.0;
pub const DEFAULT_DETAIL_WAIT_SECS: f64 = 25.0;
pub const DEFAULT_FEED_WAIT_SECS: f64 = 12.0;

/// 采集配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub mode: HarvestMode,
    pub output_dir: PathBuf,
    /// 在底部连续多少次没有增长后结束
    pub idle_threshold: u32,
    /// 每次滚动的距离占视口高度的比例
    pub scroll_step: f64,
    /// 单次下载等待响应和每个数据块的超时
    pub request_timeout_secs: f64,
    /// 随机停顿的下限
    pub pause_min_secs: f64,
    /// 随机停顿的上限
    pub pause_max_secs: f64,
    /// 开始扫描前回到顶部后的停顿
    pub settle_secs: f64,
    /// 检测到增长后向上回拉的距离
    pub nudge_px: f64,
    pub nudge_pause_secs: f64,
    /// 详情页等待预览元数据的上限
    pub detail_wait_secs: f64,
    /// 开始滚动前等待条目链接出现的上限
    pub feed_wait_secs: f64,
    pub referer: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            mode: HarvestMode::Shallow,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            scroll_step: DEFAULT_SCROLL_STEP,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            pause_min_secs: DEFAULT_PAUSE_MIN_SECS,
            pause_max_secs: DEFAULT_PAUSE_MAX_SECS,
            settle_secs: 0.5,
            nudge_px: 200.0,
            nudge_pause_secs: 0.25,
            detail_wait_secs: DEFAULT_DETAIL_WAIT_SECS,
            feed_wait_secs: DEFAULT_FEED_WAIT_SECS,
            referer: FEED_REFERER.to_string(),
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0))
}

impl HarvestConfig {
    pub fn new(mode: HarvestMode, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// 检查参数范围
    pub fn validate(&self) -> HarvestResult<()> {
        if self.idle_threshold == 0 {
            return Err(HarvestError::Config(
                "idle_threshold must be at least 1".to_string(),
            ));
        }
        if !(self.scroll_step > 0.0 && self.scroll_step <= 1.0) {
            return Err(HarvestError::Config(format!(
                "scroll_step must be in (0, 1], got {}",
                self.scroll_step
            )));
        }
        if !(self.request_timeout_secs > 0.0) {
            return Err(HarvestError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if !(self.detail_wait_secs >= 0.0 && self.feed_wait_secs >= 0.0) {
            return Err(HarvestError::Config(
                "wait timeouts must not be negative".to_string(),
            ));
        }
        if !(self.pause_min_secs >= 0.0 && self.pause_min_secs <= self.pause_max_secs) {
            return Err(HarvestError::Config(format!(
                "pause bounds must satisfy 0 <= min <= max, got {}..{}",
                self.pause_min_secs, self.pause_max_secs
            )));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(HarvestError::Config("output_dir is empty".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        secs(self.request_timeout_secs)
    }

    pub fn pause_bounds(&self) -> (Duration, Duration) {
        (secs(self.pause_min_secs), secs(self.pause_max_secs))
    }

    pub fn settle(&self) -> Duration {
        secs(self.settle_secs)
    }

    pub fn nudge_pause(&self) -> Duration {
        secs(self.nudge_pause_secs)
    }

    pub fn detail_wait(&self) -> Duration {
        secs(self.detail_wait_secs)
    }

    pub fn feed_wait(&self) -> Duration {
        secs(self.feed_wait_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HarvestConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.idle_threshold, 2);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(
            config.pause_bounds(),
            (Duration::from_millis(600), Duration::from_secs(4))
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = vec![
            HarvestConfig { idle_threshold: 0, ..HarvestConfig::default() },
            HarvestConfig { scroll_step: 0.0, ..HarvestConfig::default() },
            HarvestConfig { scroll_step: 1.5, ..HarvestConfig::default() },
            HarvestConfig { scroll_step: f64::NAN, ..HarvestConfig::default() },
            HarvestConfig { request_timeout_secs: 0.0, ..HarvestConfig::default() },
            HarvestConfig { pause_min_secs: 5.0, pause_max_secs: 1.0, ..HarvestConfig::default() },
            HarvestConfig { output_dir: PathBuf::new(), ..HarvestConfig::default() },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(HarvestError::Config(_))),
                "should reject {:?}",
                config
            );
        }
    }

    #[test]
    fn test_deserialize_partial() {
        let config: HarvestConfig =
            serde_json::from_str(r#"{"mode":"deep","idle_threshold":3}"#).unwrap();
        assert_eq!(config.mode, HarvestMode::Deep);
        assert_eq!(config.idle_threshold, 3);
        assert_eq!(config.scroll_step, DEFAULT_SCROLL_STEP);
    }
}
