use std::time::Duration;

use crate::config::Stage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSnapshot {
    /// 0-based stage index.
    pub index: usize,
    pub count: usize,
    pub stage_elapsed: Duration,
    pub stage_remaining: Duration,
    pub start_target: u64,
    pub end_target: u64,
    pub current_target: u64,
}

/// Piecewise-linear VU target over run time.
#[derive(Debug, Clone)]
pub struct RampSchedule {
    start: u64,
    stages: Vec<Stage>,
    cumulative_ends: Vec<Duration>,
}

impl RampSchedule {
    pub fn new(start: u64, stages: Vec<Stage>) -> Self {
        let mut cumulative_ends = Vec::with_capacity(stages.len());
        let mut acc = Duration::ZERO;
        for s in &stages {
            acc = acc.saturating_add(s.duration);
            cumulative_ends.push(acc);
        }

        Self {
            start,
            stages,
            cumulative_ends,
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn start_target(&self) -> u64 {
        self.start
    }

    pub fn total_duration(&self) -> Duration {
        self.cumulative_ends
            .last()
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_done(&self, elapsed: Duration) -> bool {
        elapsed >= self.total_duration()
    }

    /// Highest target any point of the schedule asks for.
    pub fn peak_target(&self) -> u64 {
        self.stages
            .iter()
            .map(|s| s.target)
            .fold(self.start, u64::max)
    }

    pub fn target_at(&self, elapsed: Duration) -> u64 {
        if self.stages.is_empty() || elapsed > self.total_duration() {
            return 0;
        }

        // Stages with `end <= elapsed` are finished.
        let idx = self.cumulative_ends.partition_point(|end| *end <= elapsed);

        // Exactly on a boundary: the last stage ending here owns the value.
        if idx > 0 && self.cumulative_ends[idx - 1] == elapsed {
            return self.stages[idx - 1].target;
        }

        let (stage_start, start_target) = self.stage_origin(idx);
        let stage_duration = self.cumulative_ends[idx].saturating_sub(stage_start);
        let stage_elapsed = elapsed.saturating_sub(stage_start);

        interpolate(
            start_target,
            self.stages[idx].target,
            stage_elapsed,
            stage_duration,
        )
    }

    pub fn stage_snapshot_at(&self, elapsed: Duration) -> Option<StageSnapshot> {
        if self.stages.is_empty() {
            return None;
        }

        let clamped = elapsed.min(self.total_duration());
        let idx = self
            .cumulative_ends
            .partition_point(|end| *end <= clamped)
            .min(self.stages.len() - 1);

        let (stage_start, start_target) = self.stage_origin(idx);
        let stage_duration = self.cumulative_ends[idx].saturating_sub(stage_start);
        let stage_elapsed = clamped.saturating_sub(stage_start);

        Some(StageSnapshot {
            index: idx,
            count: self.stages.len(),
            stage_elapsed,
            stage_remaining: stage_duration.saturating_sub(stage_elapsed),
            start_target,
            end_target: self.stages[idx].target,
            current_target: self.target_at(elapsed),
        })
    }

    /// Start time and starting target of stage `idx`.
    fn stage_origin(&self, idx: usize) -> (Duration, u64) {
        if idx == 0 {
            (Duration::ZERO, self.start)
        } else {
            (self.cumulative_ends[idx - 1], self.stages[idx - 1].target)
        }
    }
}

fn interpolate(from: u64, to: u64, elapsed: Duration, duration: Duration) -> u64 {
    if duration.is_zero() {
        return to;
    }

    let den = duration.as_nanos();
    let num = elapsed.as_nanos().min(den);

    // from * (d - t) + to * t stays non-negative, so rounding half up is half away from zero.
    let weighted = u128::from(from)
        .saturating_mul(den - num)
        .saturating_add(u128::from(to).saturating_mul(num));
    let cur = weighted.saturating_add(den / 2) / den;
    u64::try_from(cur).unwrap_or(u64::MAX)
}
