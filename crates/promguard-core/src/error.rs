//! Shared error type across promguard crates.

use thiserror::Error;

/// Stable error classification, independent of message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected mutation (negative or NaN counter increment).
    InvalidArgument,
    /// Backend refused to construct or register a metric.
    RegistrationFailed,
    /// Event sink has no receiver left.
    SinkClosed,
    /// Deadline delivery gave up waiting for sink capacity.
    PublishTimeout,
    /// Waiting for sink capacity would stall a single-threaded async runtime.
    WouldBlock,
    /// Malformed or out-of-range configuration.
    BadConfig,
    /// Unsupported config version.
    UnsupportedVersion,
    /// I/O or encoder failure.
    Internal,
}

impl ErrorKind {
    /// String representation used in logs and tests.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::RegistrationFailed => "REGISTRATION_FAILED",
            ErrorKind::SinkClosed => "SINK_CLOSED",
            ErrorKind::PublishTimeout => "PUBLISH_TIMEOUT",
            ErrorKind::WouldBlock => "WOULD_BLOCK",
            ErrorKind::BadConfig => "BAD_CONFIG",
            ErrorKind::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PromGuardError>;

/// Unified error type used by core and registry.
#[derive(Debug, Error)]
pub enum PromGuardError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("registration of {name} failed: {reason}")]
    Registration { name: String, reason: String },
    #[error("{0} sink closed")]
    SinkClosed(&'static str),
    #[error("{sink} sink publish timed out after {waited_ms}ms")]
    PublishTimeout { sink: &'static str, waited_ms: u64 },
    #[error("{0} sink full; waiting would block the current-thread runtime")]
    WouldBlock(&'static str),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl PromGuardError {
    /// Map error to its stable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PromGuardError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            PromGuardError::Registration { .. } => ErrorKind::RegistrationFailed,
            PromGuardError::SinkClosed(_) => ErrorKind::SinkClosed,
            PromGuardError::PublishTimeout { .. } => ErrorKind::PublishTimeout,
            PromGuardError::WouldBlock(_) => ErrorKind::WouldBlock,
            PromGuardError::BadConfig(_) => ErrorKind::BadConfig,
            PromGuardError::UnsupportedVersion => ErrorKind::UnsupportedVersion,
            PromGuardError::Internal(_) => ErrorKind::Internal,
        }
    }
}
