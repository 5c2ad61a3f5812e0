//! Error types for asyncterm-core

use thiserror::Error;

/// Console error type
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Resource setup failed before the input loop started
    #[error("Resource setup failed: {0:#}")]
    Setup(#[source] anyhow::Error),

    /// Terminal size could not be queried (not an interactive terminal)
    #[error("Terminal geometry query failed: {0}")]
    Geometry(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl ConsoleError {
    /// True for failures that abort the console before the input loop runs
    pub fn is_startup_failure(&self) -> bool {
        matches!(self, ConsoleError::Setup(_) | ConsoleError::Geometry(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ConsoleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConsoleError::InvalidState("console already ran".into());
        assert_eq!(err.to_string(), "Invalid state: console already ran");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "test");
        let console_err: ConsoleError = io_err.into();
        assert!(matches!(console_err, ConsoleError::Io(_)));
        assert!(!console_err.is_startup_failure());
    }

    #[test]
    fn test_setup_error_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("opening pool");
        let console_err = ConsoleError::Setup(err);
        assert!(console_err.is_startup_failure());
        assert_eq!(
            console_err.to_string(),
            "Resource setup failed: opening pool: connection refused"
        );
    }

    #[test]
    fn test_geometry_error_is_startup_failure() {
        let err = ConsoleError::Geometry(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "not a tty",
        ));
        assert!(err.is_startup_failure());
        assert_eq!(err.to_string(), "Terminal geometry query failed: not a tty");
    }
}
