use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure class used for logging failed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum HttpTransportErrorKind {
    InvalidRequest,
    Connect,
    Timeout,
    Transport,
    Body,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("only http:// and https:// URLs are supported: {0}")]
    UnsupportedScheme(String),

    #[error("invalid header `{0}`")]
    InvalidHeader(String),

    #[error("failed to build request: {0}")]
    Build(#[from] http::Error),

    #[error("request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to read response body: {0}")]
    Body(#[from] hyper::Error),
}

impl Error {
    #[must_use]
    pub fn transport_error_kind(&self) -> HttpTransportErrorKind {
        match self {
            Self::InvalidUrl(_) | Self::UnsupportedScheme(_) | Self::InvalidHeader(_) | Self::Build(_) => {
                HttpTransportErrorKind::InvalidRequest
            }
            Self::Transport(e) if e.is_connect() => HttpTransportErrorKind::Connect,
            Self::Transport(_) => HttpTransportErrorKind::Transport,
            Self::Timeout(_) => HttpTransportErrorKind::Timeout,
            Self::Body(_) => HttpTransportErrorKind::Body,
        }
    }
}
