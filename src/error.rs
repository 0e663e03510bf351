use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    ConfigValidation(String),

    #[error("credentials error: {0}")]
    Credentials(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Failure of a single request to the review service.
///
/// The scheduler treats every variant the same way: the cycle fails, the
/// degraded indicator is raised, and the next poll happens on the normal
/// interval.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Network unreachable, connection reset, request timed out.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status, or a Conduit `error_code` in an otherwise ok response.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Response body was not the shape we expected.
    #[error("decode error: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, Error>;
