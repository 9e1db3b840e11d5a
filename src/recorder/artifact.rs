//! Finalized recording artifact

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The finalized recording: one binary blob with a declared media type
///
/// Immutable once created. Lives from the end of a recording until the
/// session ends (discard, a new recording, or an upload the caller chooses
/// to release it after).
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Unique id for this artifact
    pub id: Uuid,

    /// Concatenated encoded media bytes
    pub data: Vec<u8>,

    /// Container/codec identifier (e.g. `video/webm;codecs=vp8,opus`)
    pub media_type: String,

    /// Recorded duration in whole seconds
    pub duration_secs: u32,

    /// When the artifact was finalized
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub(crate) fn new(data: Vec<u8>, media_type: String, duration_secs: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            data,
            media_type,
            duration_secs,
            created_at: Utc::now(),
        }
    }

    /// Size of the encoded payload in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Lightweight serializable description, without the payload.
    pub fn metadata(&self) -> ArtifactMetadata {
        ArtifactMetadata {
            id: self.id,
            media_type: self.media_type.clone(),
            duration_secs: self.duration_secs,
            size_bytes: self.data.len() as u64,
            created_at: self.created_at,
        }
    }
}

/// Serializable artifact description for hosts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub id: Uuid,
    pub media_type: String,
    pub duration_secs: u32,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}
