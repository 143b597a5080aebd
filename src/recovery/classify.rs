//! Error Classification
//!
//! Maps operation failures to a structured `ErrorKind` and renders the
//! `"<Kind>: <message>"` string that error-pattern regexes match against.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// == Error Kind ==
/// Structured class of an operation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input that could not be parsed
    Syntax,
    /// Input of the wrong shape or type
    Type,
    /// Reference to something undefined
    Reference,
    /// Connection-level failure
    Network,
    Timeout,
    NotFound,
    OutOfMemory,
    Other,
}

impl ErrorKind {
    /// Name used as the prefix of the stringified error.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Reference => "ReferenceError",
            ErrorKind::Network => "NetworkError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::OutOfMemory => "OutOfMemoryError",
            ErrorKind::Other => "Error",
        }
    }

    /// Malformed-input errors are never retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ErrorKind::Syntax | ErrorKind::Type | ErrorKind::Reference
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// == Operation Error ==
/// Error type operations can return to classify their own failures.
///
/// ```ignore
/// return Err(OperationError::syntax("unexpected token '}'").into());
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct OperationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl OperationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Reference, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }
}

// == Classify ==
/// Classifies an error by the first recognised cause in its chain.
pub fn classify(err: &anyhow::Error) -> ErrorKind {
    for cause in err.chain() {
        if let Some(op) = cause.downcast_ref::<OperationError>() {
            return op.kind;
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return classify_io(io_err.kind());
        }
        if let Some(json_err) = cause.downcast_ref::<serde_json::Error>() {
            return match json_err.classify() {
                serde_json::error::Category::Syntax | serde_json::error::Category::Eof => {
                    ErrorKind::Syntax
                }
                serde_json::error::Category::Data => ErrorKind::Type,
                serde_json::error::Category::Io => ErrorKind::Other,
            };
        }
    }
    ErrorKind::Other
}

fn classify_io(kind: io::ErrorKind) -> ErrorKind {
    match kind {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorKind::Timeout,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::BrokenPipe => ErrorKind::Network,
        io::ErrorKind::OutOfMemory => ErrorKind::OutOfMemory,
        io::ErrorKind::InvalidData => ErrorKind::Type,
        _ => ErrorKind::Other,
    }
}

// == Describe ==
/// Renders the error as `"<KindName>: <message chain>"`.
pub fn describe(err: &anyhow::Error) -> String {
    format!("{}: {:#}", classify(err).name(), err)
}
