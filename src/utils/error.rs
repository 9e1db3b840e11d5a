//! Error types and handling
//!
//! The pipeline surfaces typed error kinds, never presentation strings;
//! translating a kind into a user-facing message is the host's job.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline-wide error type
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("capture permission denied by the user or OS")]
    PermissionDenied,

    #[error("no matching capture device, or the share prompt was cancelled")]
    DeviceUnavailable,

    #[error("capture device lost mid-recording")]
    DeviceLost,

    #[error("capture acquisition timed out")]
    AcquisitionTimeout,

    #[error("recording already stopped")]
    AlreadyStopped,

    #[error("{operation} is not valid in the {state} state")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("no video frame available for snapshot")]
    NoFrameAvailable,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Classify this error for hosts that key messaging off kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::PermissionDenied => ErrorKind::PermissionDenied,
            PipelineError::DeviceUnavailable => ErrorKind::DeviceUnavailable,
            PipelineError::DeviceLost => ErrorKind::DeviceLost,
            PipelineError::AcquisitionTimeout => ErrorKind::AcquisitionTimeout,
            PipelineError::AlreadyStopped => ErrorKind::AlreadyStopped,
            PipelineError::InvalidState { .. } => ErrorKind::InvalidState,
            PipelineError::UploadFailed(_) => ErrorKind::UploadFailed,
            PipelineError::NoFrameAvailable => ErrorKind::NoFrameAvailable,
            PipelineError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            PipelineError::Io(_) => ErrorKind::Io,
        }
    }
}

/// Serializable error classification for hosts
///
/// Carried inside `SessionState::Error` and pipeline events so the host can
/// match on the kind without parsing message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    PermissionDenied,
    DeviceUnavailable,
    DeviceLost,
    AcquisitionTimeout,
    AlreadyStopped,
    InvalidState,
    UploadFailed,
    NoFrameAvailable,
    InvalidConfig,
    Io,
}

/// Result type alias using PipelineError
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_classification_is_stable() {
        assert_eq!(
            PipelineError::PermissionDenied.kind(),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            PipelineError::UploadFailed("503".into()).kind(),
            ErrorKind::UploadFailed
        );
        assert_eq!(
            PipelineError::InvalidState {
                operation: "upload",
                state: "idle"
            }
            .kind(),
            ErrorKind::InvalidState
        );
    }

    #[test]
    fn kind_serializes_camel_case() {
        let json = serde_json::to_string(&ErrorKind::PermissionDenied).unwrap();
        assert_eq!(json, "\"permissionDenied\"");
    }
}
