//! Error types for the device utilities

pub type Result<T> = std::result::Result<T, UtilsError>;

#[derive(Debug, thiserror::Error)]
pub enum UtilsError {
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

    /// JSON configuration error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Persistent log file error with path
    #[error("Log file error for '{path}': {message}")]
    LogFileError { path: String, message: String },

    /// Formatter worker could not be started or has gone away
    #[error("Log formatter unavailable: {0}")]
    FormatterUnavailable(String),

    /// Sink write error
    #[error("Sink '{sink}' failed: {message}")]
    SinkError { sink: String, message: String },

    /// Address that could not be parsed
    #[error("Failed to parse {field} address: '{value}'")]
    AddressParse { field: String, value: String },

    /// Time string that could not be parsed
    #[error("Failed to parse time '{value}': {message}")]
    TimeParse { value: String, message: String },
}

impl UtilsError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        UtilsError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        UtilsError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a log file error
    pub fn log_file(path: impl Into<String>, message: impl Into<String>) -> Self {
        UtilsError::LogFileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a sink error
    pub fn sink(sink: impl Into<String>, message: impl Into<String>) -> Self {
        UtilsError::SinkError {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create an address parse error
    pub fn address(field: impl Into<String>, value: impl Into<String>) -> Self {
        UtilsError::AddressParse {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a time parse error
    pub fn time(value: impl Into<String>, message: impl Into<String>) -> Self {
        UtilsError::TimeParse {
            value: value.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = UtilsError::config("LogConfig", "zero capacity");
        assert!(matches!(err, UtilsError::InvalidConfiguration { .. }));

        let err = UtilsError::log_file("/data/log.txt", "Permission denied");
        assert!(matches!(err, UtilsError::LogFileError { .. }));

        let err = UtilsError::address("station", "10.0.0");
        assert!(matches!(err, UtilsError::AddressParse { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = UtilsError::log_file("/data/log.txt", "Disk full");
        assert_eq!(err.to_string(), "Log file error for '/data/log.txt': Disk full");

        let err = UtilsError::sink("network", "broken pipe");
        assert_eq!(err.to_string(), "Sink 'network' failed: broken pipe");

        let err = UtilsError::address("access point", "abc");
        assert_eq!(err.to_string(), "Failed to parse access point address: 'abc'");
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = UtilsError::io_operation("opening log file", "cannot append", io_err);

        assert!(matches!(err, UtilsError::IoOperation { .. }));
        assert!(err.to_string().contains("opening log file"));
        assert!(err.to_string().contains("cannot append"));
    }
}
