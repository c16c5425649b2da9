use std::time::Duration;
use tokio::time::Instant;

/// Monotonic run time. Every "which stage applies now" decision reads this.
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    started: Instant,
}

impl RunClock {
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Instant at which `offset` of run time has passed.
    #[must_use]
    pub fn at(&self, offset: Duration) -> Instant {
        self.started + offset
    }
}
