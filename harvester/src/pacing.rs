//! 随机停顿

use rand::RngExt;
use std::time::Duration;

use crate::cancel::CancelToken;

/// 停顿时长来源
pub trait Jitter: Send + Sync {
    /// 返回 `[min, max]` 之间的时长
    fn sample(&self, min: Duration, max: Duration) -> Duration;
}

/// 均匀分布的随机停顿
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformJitter;

impl Jitter for UniformJitter {
    fn sample(&self, min: Duration, max: Duration) -> Duration {
        let (lo, hi) = (min.as_secs_f64(), max.as_secs_f64());
        if hi <= lo {
            return min;
        }
        let mut rng = rand::rng();
        Duration::from_secs_f64(rng.random_range(lo..=hi))
    }
}

/// 固定时长，测试时使用
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedJitter(pub Duration);

impl Jitter for FixedJitter {
    fn sample(&self, _min: Duration, _max: Duration) -> Duration {
        self.0
    }
}

/// 随机停顿，取消时提前返回
///
/// 返回 `false` 表示停顿被取消打断。
pub async fn pause(jitter: &dyn Jitter, cancel: &CancelToken, min: Duration, max: Duration) -> bool {
    sleep_unless_cancelled(cancel, jitter.sample(min, max)).await
}

/// 固定时长的可取消停顿
pub async fn sleep_unless_cancelled(cancel: &CancelToken, duration: Duration) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if duration.is_zero() {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = cancel.cancelled() => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_uniform_jitter_bounds() {
        let jitter = UniformJitter;
        let (min, max) = (Duration::from_millis(600), Duration::from_secs(4));
        for _ in 0..200 {
            let d = jitter.sample(min, max);
            assert!(d >= min && d <= max, "{:?} out of range", d);
        }
        assert_eq!(jitter.sample(max, min), max);
        assert_eq!(jitter.sample(Duration::ZERO, Duration::ZERO), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_pause_interrupted_by_cancel() {
        let cancel = CancelToken::new();
        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                cancel.cancel();
            })
        };

        let start = Instant::now();
        let completed = pause(
            &FixedJitter(Duration::from_secs(10)),
            &cancel,
            Duration::ZERO,
            Duration::ZERO,
        )
        .await;
        canceller.await.unwrap();

        assert!(!completed);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
