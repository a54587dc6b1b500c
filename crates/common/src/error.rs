//! Error types shared across Slidecut crates.

use std::path::PathBuf;

/// Message shown when an export is requested on an empty timeline.
pub const EMPTY_TIMELINE_MESSAGE: &str = "Add some clips to the timeline before exporting.";

/// Message shown for any failure inside an in-flight export.
pub const GENERIC_EXPORT_FAILURE_MESSAGE: &str =
    "An error occurred during export. Check the logs for details.";

/// Top-level error type for Slidecut operations.
#[derive(Debug, thiserror::Error)]
pub enum SlidecutError {
    /// An operation was requested in a state where it cannot start.
    #[error("{message}")]
    Precondition { message: String },

    /// A required device or service is not present.
    #[error("Unavailable: {message}")]
    Unavailable { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Audio error: {message}")]
    Audio { message: String },

    #[error("Project error: {message}")]
    Project { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SlidecutError.
pub type SlidecutResult<T> = Result<T, SlidecutError>;

impl SlidecutError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition {
            message: msg.into(),
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable {
            message: msg.into(),
        }
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio {
            message: msg.into(),
        }
    }

    pub fn project(msg: impl Into<String>) -> Self {
        Self::Project {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error was raised before any resource was acquired.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }

    /// Text suitable for showing to the user.
    ///
    /// Preconditions and permission problems are reported verbatim; every
    /// other failure collapses to a generic message, the details go to the log.
    pub fn user_message(&self) -> String {
        match self {
            Self::Precondition { message } => message.clone(),
            Self::PermissionDenied { message } => {
                format!("Permission was denied: {message}")
            }
            Self::Unavailable { message } => message.clone(),
            _ => GENERIC_EXPORT_FAILURE_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_message_is_verbatim() {
        let err = SlidecutError::precondition(EMPTY_TIMELINE_MESSAGE);
        assert!(err.is_precondition());
        assert_eq!(err.user_message(), EMPTY_TIMELINE_MESSAGE);
        assert_eq!(err.to_string(), EMPTY_TIMELINE_MESSAGE);
    }

    #[test]
    fn test_runtime_failures_collapse_to_generic_message() {
        let err = SlidecutError::audio("decoder rejected narration.webm");
        assert!(!err.is_precondition());
        assert_eq!(err.user_message(), GENERIC_EXPORT_FAILURE_MESSAGE);
    }

    #[test]
    fn test_permission_denied_is_distinct() {
        let err = SlidecutError::permission_denied("microphone");
        assert_ne!(err.user_message(), GENERIC_EXPORT_FAILURE_MESSAGE);
        assert!(err.user_message().contains("microphone"));
    }
}
