use crate::metrics::MetricKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("metric name must not be empty")]
    EmptyName,

    #[error("metric `{name}` is a {existing}, cannot record a {requested} sample")]
    KindMismatch {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },

    #[error("counter `{name}` only accepts finite, non-negative contributions (got {value})")]
    InvalidCounterValue { name: String, value: f64 },

    #[error("trend `{name}` only accepts finite values (got {value})")]
    InvalidTrendValue { name: String, value: f64 },
}
