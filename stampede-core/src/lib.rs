//! Staged-ramp load engine: drives a time-varying number of virtual users
//! through a scenario, records metrics, and judges the run against thresholds.

mod clock;
mod config;
mod error;
mod http;
mod iteration_metrics;
mod outputs;
mod pool;
mod progress;
mod report;
mod run;
mod scenario;
mod schedule;
mod signal;
mod summary;
mod thresholds;
mod thresholds_eval;
mod vu;

pub use clock::RunClock;
pub use config::{DEFAULT_CONTROL_INTERVAL, RunOptions, Stage};
pub use error::{Error, Result};
pub use http::{HTTP_REQ_DURATION, HTTP_REQ_FAILED, HTTP_REQS, RequestClient, Transport};
pub use iteration_metrics::{ITERATION_DURATION, ITERATION_FAILED, ITERATIONS, record_iteration};
pub use outputs::{validate_output_path, write_output_file, write_summary_json};
pub use progress::{LiveMetrics, ProgressFn, ProgressUpdate};
pub use report::{Hint, Report, ReportMetrics, render_text, snapshot_json};
pub use run::{RunHandle, Runner};
pub use scenario::{IterationOutcome, Scenario, ThinkTime, uniform_jitter};
pub use schedule::{RampSchedule, StageSnapshot};
pub use signal::StopSignal;
pub use summary::RunResult;
pub use thresholds::{
    Threshold, ThresholdAgg, ThresholdExpr, ThresholdOp, ThresholdSet, compile_thresholds,
    parse_threshold_expr,
};
pub use thresholds_eval::{ThresholdOutcome, evaluate_thresholds, verdict};
pub use vu::{CHECKS, IterationContext, WorkerContext};

pub use stampede_http::{HttpClient, HttpRequest, HttpResponse};
pub use stampede_metrics::{MetricKind, MetricValue, MetricsSnapshot, Registry};
