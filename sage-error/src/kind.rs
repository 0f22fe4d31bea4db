//! Error kinds for sage operations

use std::fmt;

/// The kind of error that occurred.
///
/// This enum categorizes errors to help callers write clear error handling
/// logic. Callers can match on ErrorKind to decide how to handle specific
/// error cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Invalid configuration or parameters
    ConfigInvalid,

    /// Unknown tool name
    ToolUnknown,

    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    /// Serialization/deserialization failed
    SerializationFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::ToolUnknown => "ToolUnknown",
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::FileNotFound.to_string(), "FileNotFound");
        assert_eq!(ErrorKind::ConfigInvalid.to_string(), "ConfigInvalid");
    }
}
