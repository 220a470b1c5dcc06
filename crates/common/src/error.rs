//! Error types shared across Unmark crates.

use std::path::PathBuf;

/// Top-level error type for Unmark operations.
#[derive(Debug, thiserror::Error)]
pub enum UnmarkError {
    #[error("Failed to load processing engine: {message}")]
    EngineLoad { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Processing failed: {message}")]
    Execution { message: String },

    #[error("Engine not ready: {message}")]
    NotReady { message: String },

    #[error("Engine busy: {message}")]
    Busy { message: String },

    #[error("Artifact was not produced by the last execution: {name}")]
    UnknownArtifact { name: String },

    #[error("Media error: {message}")]
    Media { message: String },

    #[error("Selection error: {message}")]
    Selection { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using UnmarkError.
pub type UnmarkResult<T> = Result<T, UnmarkError>;

impl UnmarkError {
    pub fn engine_load(msg: impl Into<String>) -> Self {
        Self::EngineLoad {
            message: msg.into(),
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: msg.into(),
        }
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution {
            message: msg.into(),
        }
    }

    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady {
            message: msg.into(),
        }
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy {
            message: msg.into(),
        }
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media {
            message: msg.into(),
        }
    }

    pub fn selection(msg: impl Into<String>) -> Self {
        Self::Selection {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error describes a programming invariant rather than
    /// something the user can act on.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::NotReady { .. } | Self::UnknownArtifact { .. })
    }

    /// Status text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::EngineLoad { .. } => {
                "Failed to load FFmpeg. Please restart the application.".to_string()
            }
            Self::InvalidRequest { .. } => {
                "Please select a watermark region or upload audio".to_string()
            }
            Self::Busy { .. } => "A video is already being processed".to_string(),
            Self::NotReady { .. } => {
                "Please load a video and wait for FFmpeg to load".to_string()
            }
            other => format!("Error: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_user_message() {
        let err = UnmarkError::invalid_request("nothing to do");
        assert_eq!(
            err.user_message(),
            "Please select a watermark region or upload audio"
        );
        assert!(!err.is_internal());
    }

    #[test]
    fn test_execution_message_includes_reason() {
        let err = UnmarkError::execution("ffmpeg exited with status 1");
        assert!(err.user_message().contains("ffmpeg exited with status 1"));
    }

    #[test]
    fn test_not_ready_is_internal() {
        assert!(UnmarkError::not_ready("engine not loaded").is_internal());
    }
}
