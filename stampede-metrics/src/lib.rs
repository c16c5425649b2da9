pub mod agg;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod snapshot;
pub mod trend;

pub use error::{Error, Result};
pub use metrics::{CounterValue, MetricKind, MetricValue, RateValue, Sample};
pub use registry::Registry;
pub use snapshot::{CheckSummary, MetricsSnapshot};
pub use trend::{SUMMARY_PERCENTILES, TrendValue};
