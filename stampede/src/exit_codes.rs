#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// The run finished but at least one threshold failed.
    ThresholdsFailed = 11,

    /// Bad flags, config, stages, thresholds or output paths.
    InvalidInput = 30,

    /// The run could not be carried out (runtime setup, task failures).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Failed checks are reported but never change the exit code.
    #[must_use]
    pub fn from_thresholds(passed: bool) -> Self {
        if passed {
            Self::Success
        } else {
            Self::ThresholdsFailed
        }
    }
}
