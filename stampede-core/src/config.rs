use std::time::Duration;

use crate::error::{Error, Result};
use crate::scenario::ThinkTime;
use crate::thresholds::ThresholdSet;

pub const DEFAULT_CONTROL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: u64,
}

impl Stage {
    #[must_use]
    pub fn new(duration: Duration, target: u64) -> Self {
        Self { duration, target }
    }

    /// Builds a stage from user-facing numbers, rejecting negative or non-finite input.
    pub fn checked(index: usize, duration_secs: f64, target: i64) -> Result<Self> {
        if !duration_secs.is_finite() || duration_secs < 0.0 {
            return Err(Error::InvalidStageDuration {
                index,
                secs: duration_secs,
            });
        }
        let target =
            u64::try_from(target).map_err(|_| Error::NegativeStageTarget { index, target })?;
        let duration =
            Duration::try_from_secs_f64(duration_secs).map_err(|_| Error::InvalidStages)?;
        Ok(Self { duration, target })
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub start_vus: u64,
    pub stages: Vec<Stage>,
    pub thresholds: Vec<ThresholdSet>,
    pub control_interval: Duration,
    pub iteration_timeout: Option<Duration>,
    /// Applied to requests sent through the instrumented client that carry no timeout.
    pub request_timeout: Option<Duration>,
    pub think_time: ThinkTime,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            start_vus: 0,
            stages: Vec::new(),
            thresholds: Vec::new(),
            control_interval: DEFAULT_CONTROL_INTERVAL,
            iteration_timeout: None,
            request_timeout: None,
            think_time: ThinkTime::none(),
        }
    }
}

impl RunOptions {
    pub fn validate(&self) -> Result<()> {
        if self.control_interval.is_zero() {
            return Err(Error::InvalidControlInterval);
        }
        if let Some(t) = self.iteration_timeout
            && t.is_zero()
        {
            return Err(Error::InvalidIterationTimeout(t));
        }

        let total = self
            .stages
            .iter()
            .try_fold(Duration::ZERO, |acc, s| acc.checked_add(s.duration));
        if total.is_none() {
            return Err(Error::InvalidStages);
        }
        Ok(())
    }
}
