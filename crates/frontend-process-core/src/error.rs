use thiserror::Error;

/// Core error types for frontend process operations
#[derive(Error, Debug)]
pub enum FrontendError {
    #[error("Failed to spawn subordinate process {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Subordinate process is already running: {0}")]
    AlreadyRunning(String),

    #[error("Standard input has already been handed to a subordinate process")]
    StdinTransferred,

    #[error("Packet channel is closed")]
    ChannelClosed,

    #[error("IPC link error: {0}")]
    Ipc(String),

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Process was not launched as a subordinate")]
    NotSubordinate,

    #[error("Subordinate was launched for frontend {found:?}, expected {expected:?}")]
    FrontendMismatch { expected: String, found: String },

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl FrontendError {
    /// Check if this error prevents the frontend from being started at all
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FrontendError::SpawnFailed { .. }
                | FrontendError::Configuration(_)
                | FrontendError::FrontendMismatch { .. }
        )
    }

    /// Check if this error belongs to the IPC link rather than the process itself
    pub fn is_link_error(&self) -> bool {
        matches!(
            self,
            FrontendError::Ipc(_) | FrontendError::Io(_) | FrontendError::ChannelClosed
        )
    }
}

/// Outcome of a single read attempt on a packet channel
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// Nothing arrived within the requested window
    #[error("No packet available")]
    Empty,

    /// The producing side is gone and the queue is drained
    #[error("Packet channel disconnected")]
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categorization() {
        let spawn = FrontendError::SpawnFailed {
            program: "missing".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(spawn.is_fatal());
        assert!(!spawn.is_link_error());

        assert!(FrontendError::Configuration("bad".to_string()).is_fatal());
        assert!(!FrontendError::StdinTransferred.is_fatal());

        assert!(FrontendError::Ipc("reset".to_string()).is_link_error());
        assert!(FrontendError::ChannelClosed.is_link_error());
        assert!(!FrontendError::NotSubordinate.is_link_error());
    }

    #[test]
    fn test_error_display() {
        let error = FrontendError::SpawnFailed {
            program: "/no/such/binary".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let display = format!("{error}");
        assert!(display.contains("Failed to spawn subordinate process"));
        assert!(display.contains("/no/such/binary"));

        let error = FrontendError::FrontendMismatch {
            expected: "Recorder".to_string(),
            found: "Console".to_string(),
        };
        let display = format!("{error}");
        assert!(display.contains("\"Console\""));
        assert!(display.contains("\"Recorder\""));
    }

    #[test]
    fn test_read_error_is_plain_value() {
        assert_eq!(ReadError::Empty, ReadError::Empty);
        assert_ne!(ReadError::Empty, ReadError::Disconnected);
        assert_eq!(format!("{}", ReadError::Empty), "No packet available");
    }
}
