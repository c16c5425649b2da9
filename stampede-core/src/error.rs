use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("metrics error: {0}")]
    Metrics(#[from] stampede_metrics::Error),

    #[error("failed to serialize run snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("stage {index}: duration must be a finite, non-negative number of seconds (got {secs})")]
    InvalidStageDuration { index: usize, secs: f64 },

    #[error("stage {index}: target must be >= 0 (got {target})")]
    NegativeStageTarget { index: usize, target: i64 },

    #[error("total stage duration overflows")]
    InvalidStages,

    #[error("`control_interval` must be a positive duration")]
    InvalidControlInterval,

    #[error("`iteration_timeout` must be a positive duration (got {0:?})")]
    InvalidIterationTimeout(Duration),

    #[error("invalid threshold for metric `{metric}`: {error}")]
    InvalidThreshold { metric: String, error: String },

    #[error("invalid output path: `{0}`")]
    InvalidOutputPath(String),
}
