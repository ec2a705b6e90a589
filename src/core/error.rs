//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unrecognized level name
    #[error("Invalid log level: '{0}'")]
    InvalidLevel(String),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Worker already stopped
    #[error("Log worker already stopped")]
    WorkerStopped,

    /// Free-form failure, e.g. from a user marshaler
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid level error
    pub fn invalid_level(name: impl Into<String>) -> Self {
        LoggerError::InvalidLevel(name.into())
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a free-form error, for marshalers that cannot encode themselves
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn test_io_operation_keeps_source() {
        let err = LoggerError::io_operation(
            "opening log file",
            "/var/log/app.log",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "IO error while opening log file: /var/log/app.log"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_invalid_level_display() {
        let err = LoggerError::invalid_level("verbose");
        assert_eq!(err.to_string(), "Invalid log level: 'verbose'");
    }

    #[test]
    fn test_config_error_display() {
        let err = LoggerError::config("time_format", "unsupported specifier");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for time_format: unsupported specifier"
        );
    }

    #[test]
    fn test_other_display() {
        let err = LoggerError::other("endpoint has no path");
        assert_eq!(err.to_string(), "endpoint has no path");
    }

    #[test]
    fn test_from_io_error() {
        let err: LoggerError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed").into();
        assert!(matches!(err, LoggerError::IoError(_)));
        assert_eq!(err.to_string(), "IO error: pipe closed");
    }

    #[test]
    fn test_worker_stopped_display() {
        assert_eq!(
            LoggerError::WorkerStopped.to_string(),
            "Log worker already stopped"
        );
    }
}
