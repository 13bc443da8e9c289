use rand::Rng;
use std::time::Duration;

/// 指数退避
///
/// 第 `n` 次重试的基础间隔为 `initial * multiplier^n`，封顶 `max_interval`，
/// 再在 `[base * (1 - factor), base * (1 + factor)]` 内随机抖动（结果同样不超过上限）。
/// `max_elapsed` 为 `None` 时永不放弃。
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Duration,
    randomization_factor: f64,
    max_elapsed: Option<Duration>,
    attempt: u32,
    elapsed: Duration,
}

impl ExponentialBackoff {
    pub fn new(initial_interval: Duration, multiplier: f64, max_interval: Duration) -> Self {
        Self {
            initial_interval,
            multiplier: multiplier.max(1.0),
            max_interval: max_interval.max(initial_interval),
            randomization_factor: 0.0,
            max_elapsed: None,
            attempt: 0,
            elapsed: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_randomization(mut self, factor: f64) -> Self {
        self.randomization_factor = factor.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn with_max_elapsed(mut self, max_elapsed: Option<Duration>) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    /// 计算第 `attempt` 次重试的等待时间，`sample` 取值 `[0, 1]`，0.5 对应无抖动
    pub fn delay_for(&self, attempt: u32, sample: f64) -> Duration {
        let max = self.max_interval.as_secs_f64();
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let base = (self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent)).min(max);

        let delta = base * self.randomization_factor;
        let sample = sample.clamp(0.0, 1.0);
        let jittered = (base - delta) + sample * (2.0 * delta);

        Duration::from_secs_f64(jittered.clamp(0.0, max))
    }

    /// 使用给定的随机样本推进一次；超过 `max_elapsed` 时返回 `None`
    pub fn next_with_sample(&mut self, sample: f64) -> Option<Duration> {
        let delay = self.delay_for(self.attempt, sample);
        if let Some(max_elapsed) = self.max_elapsed {
            if self.elapsed + delay > max_elapsed {
                return None;
            }
        }
        self.attempt = self.attempt.saturating_add(1);
        self.elapsed += delay;
        Some(delay)
    }

    pub fn next_backoff(&mut self) -> Option<Duration> {
        let sample = if self.randomization_factor > 0.0 {
            rand::thread_rng().gen_range(0.0..=1.0)
        } else {
            0.5
        };
        self.next_with_sample(sample)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
        self.elapsed = Duration::ZERO;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_elapsed.is_none()
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 2.0, Duration::from_secs(30)).with_randomization(0.5)
    }
}
