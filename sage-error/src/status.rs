//! Error status - whether an error is worth retrying

use std::fmt;

/// How an error should be treated by retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// The error is permanent - retrying will not help
    Permanent,
    /// The error is temporary - a retry may succeed
    Temporary,
    /// The error was temporary but has persisted through retries
    Persistent,
}

impl ErrorStatus {
    /// Check if an operation hitting this status may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorStatus::Temporary)
    }

    /// Transition after retries have been exhausted.
    ///
    /// Temporary errors become Persistent; everything else is unchanged.
    pub fn persist(self) -> Self {
        match self {
            ErrorStatus::Temporary => ErrorStatus::Persistent,
            other => other,
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorStatus::Permanent => "permanent",
            ErrorStatus::Temporary => "temporary",
            ErrorStatus::Persistent => "persistent",
        };
        write!(f, "{}", s)
    }
}
