//! Session state, events, and configuration
//!
//! Defines the recording lifecycle state machine tags, the broadcast event
//! type hosts subscribe to, and the pipeline configuration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::recorder::artifact::Artifact;
use crate::snapshot::Thumbnail;
use crate::utils::error::ErrorKind;

/// The authoritative lifecycle tag for a recording session
///
/// ```text
/// idle → acquiring → recording → preview → uploading → done
///           │            │          │
///           │            │          └─ discard() → idle
///           └────────────┴─ error ─ retry() → acquiring
/// ```
///
/// Exactly one state is active at a time; the pipeline is the sole owner
/// and sole mutator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// No session; ready to start
    Idle,
    /// Waiting on device acquisition (permission prompt may be up)
    Acquiring,
    /// Live session, chunks accumulating
    Recording,
    /// Finalized artifact held, awaiting discard/export/upload
    Preview,
    /// Upload in flight
    Uploading,
    /// Upload succeeded; terminal for this session
    Done,
    /// Acquisition or recording failed; retry() re-attempts acquisition
    Error(ErrorKind),
}

impl SessionState {
    /// Lowercase state name, used in `InvalidState` errors.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Acquiring => "acquiring",
            SessionState::Recording => "recording",
            SessionState::Preview => "preview",
            SessionState::Uploading => "uploading",
            SessionState::Done => "done",
            SessionState::Error(_) => "error",
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, SessionState::Recording)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SessionState::Error(_))
    }

    /// States from which a fresh recording may start.
    pub fn can_start(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Done)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Events emitted by the pipeline
///
/// Published through a broadcast channel; each transition emits exactly
/// once, in order, under the pipeline's state lock.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// The lifecycle state changed
    StateChanged(SessionState),

    /// Once-per-second progress while recording
    Progress { elapsed_secs: u32 },

    /// A finalized artifact is ready for preview
    ArtifactReady {
        artifact: Arc<Artifact>,
        thumbnail: Option<Arc<Thumbnail>>,
    },

    /// Upload finished; the locator addresses the stored object
    UploadComplete {
        locator: String,
        thumbnail: Option<Arc<Thumbnail>>,
    },

    /// An error occurred
    Error(ErrorKind),
}

/// Configuration for the recording pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Hard ceiling on recording duration, enforced autonomously
    pub max_duration_secs: u32,

    /// Chunk collection cadence in milliseconds; fixed for the session
    pub chunk_cadence_ms: u64,

    /// Audio level sampling interval in milliseconds (animation-frame
    /// class, not per-second polling)
    pub monitor_interval_ms: u64,

    /// Ceiling on device acquisition, including the permission prompt
    pub acquire_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: 180,
            chunk_cadence_ms: 1_000,
            monitor_interval_ms: 16,
            acquire_timeout_ms: 15_000,
        }
    }
}

impl PipelineConfig {
    /// Validate before use; zero durations or intervals are rejected.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_duration_secs == 0 {
            return Err("maxDurationSecs must be greater than zero".into());
        }
        if self.chunk_cadence_ms == 0 {
            return Err("chunkCadenceMs must be greater than zero".into());
        }
        if self.monitor_interval_ms == 0 {
            return Err("monitorIntervalMs must be greater than zero".into());
        }
        if self.acquire_timeout_ms == 0 {
            return Err("acquireTimeoutMs must be greater than zero".into());
        }
        Ok(())
    }

    pub fn chunk_cadence(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.chunk_cadence_ms)
    }

    pub fn monitor_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn acquire_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.acquire_timeout_ms)
    }
}
