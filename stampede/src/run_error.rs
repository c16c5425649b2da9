use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum RunError {
    InvalidInput(anyhow::Error),
    RuntimeError(anyhow::Error),
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::RuntimeError(_) => ExitCode::RuntimeError,
        }
    }

    #[must_use]
    pub fn anyhow(&self) -> &anyhow::Error {
        match self {
            Self::InvalidInput(e) | Self::RuntimeError(e) => e,
        }
    }

    /// Sorts an engine error into the caller's fault or ours.
    #[must_use]
    pub fn from_core(err: stampede_core::Error) -> Self {
        use stampede_core::Error as E;

        match err {
            E::InvalidStageDuration { .. }
            | E::NegativeStageTarget { .. }
            | E::InvalidStages
            | E::InvalidControlInterval
            | E::InvalidIterationTimeout(_)
            | E::InvalidThreshold { .. }
            | E::InvalidOutputPath(_) => Self::InvalidInput(err.into()),
            E::Io(_) | E::Join(_) | E::Metrics(_) | E::Serialize(_) => {
                Self::RuntimeError(err.into())
            }
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.anyhow())
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.anyhow().as_ref())
    }
}
