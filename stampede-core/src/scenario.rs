use rand::Rng as _;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::vu::IterationContext;

/// The unit of work a VU repeats. Called at most once per iteration per VU.
///
/// Any async `Fn(IterationContext) -> Result<IterationOutcome, E>` closure is a scenario.
pub trait Scenario: Send + Sync + 'static {
    type Error: fmt::Display + Send;

    fn iteration(
        &self,
        ctx: IterationContext,
    ) -> impl Future<Output = Result<IterationOutcome, Self::Error>> + Send;
}

impl<F, Fut, E> Scenario for F
where
    F: Fn(IterationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<IterationOutcome, E>> + Send,
    E: fmt::Display + Send,
{
    type Error = E;

    fn iteration(
        &self,
        ctx: IterationContext,
    ) -> impl Future<Output = Result<IterationOutcome, E>> + Send {
        self(ctx)
    }
}

/// What one scenario invocation reports back to its VU.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationOutcome {
    pub success: bool,
    pub status: Option<u16>,
    pub latency: Option<Duration>,
    pub message: Option<String>,
}

impl IterationOutcome {
    #[must_use]
    pub fn success() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

/// Pause a VU takes between iterations, given the number of live VUs.
#[derive(Clone)]
pub struct ThinkTime(Arc<dyn Fn(u64) -> Duration + Send + Sync>);

impl ThinkTime {
    #[must_use]
    pub fn none() -> Self {
        Self::constant(Duration::ZERO)
    }

    #[must_use]
    pub fn constant(pause: Duration) -> Self {
        Self::from_fn(move |_| pause)
    }

    pub fn from_fn(f: impl Fn(u64) -> Duration + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// `base + random(0..jitter)`.
    #[must_use]
    pub fn uniform(base: Duration, jitter: Duration) -> Self {
        Self::from_fn(move |_| base + uniform_jitter(jitter))
    }

    #[must_use]
    pub fn at(&self, live_vus: u64) -> Duration {
        (self.0)(live_vus)
    }
}

impl Default for ThinkTime {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for ThinkTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ThinkTime(..)")
    }
}

/// Uniformly random duration in `0..jitter`; zero when `jitter` is zero.
#[must_use]
pub fn uniform_jitter(jitter: Duration) -> Duration {
    if jitter.is_zero() {
        return Duration::ZERO;
    }
    let nanos = u64::try_from(jitter.as_nanos()).unwrap_or(u64::MAX);
    Duration::from_nanos(rand::thread_rng().gen_range(0..nanos))
}
