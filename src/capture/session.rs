//! Composed capture session handle
//!
//! One [`CaptureSession`] fronts every live source a recording uses: one
//! video track, at most one audio track, and the owned sources backing
//! them. Logically the session belongs to the state machine; the recorder
//! engine and signal monitor hold cheap clones for read-only access.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::traits::{AudioTrack, CaptureMode, CaptureSource, VideoTrack};
use crate::utils::error::{PipelineError, PipelineResult};

struct SessionShared {
    mode: CaptureMode,
    /// Backing sources; index 0 is the primary source, which produces the
    /// encoded chunks and carries the session's video track.
    sources: Vec<Box<dyn CaptureSource>>,
    video: Arc<dyn VideoTrack>,
    audio: Option<Arc<dyn AudioTrack>>,
    media_type: String,
    acquired_at: DateTime<Utc>,
    released: AtomicBool,
}

/// The live resource handle for one recording session
///
/// Never shared across recordings: starting a new recording always acquires
/// a fresh session. Clones share the same underlying sources; releasing any
/// clone releases them all.
#[derive(Clone)]
pub struct CaptureSession {
    shared: Arc<SessionShared>,
}

impl CaptureSession {
    pub(crate) fn new(
        mode: CaptureMode,
        sources: Vec<Box<dyn CaptureSource>>,
        video: Arc<dyn VideoTrack>,
        audio: Option<Arc<dyn AudioTrack>>,
    ) -> Self {
        debug_assert!(!sources.is_empty());
        let media_type = sources
            .first()
            .map(|s| s.media_type())
            .unwrap_or_default();
        Self {
            shared: Arc::new(SessionShared {
                mode,
                sources,
                video,
                audio,
                media_type,
                acquired_at: Utc::now(),
                released: AtomicBool::new(false),
            }),
        }
    }

    pub fn mode(&self) -> CaptureMode {
        self.shared.mode
    }

    pub fn video_track(&self) -> Arc<dyn VideoTrack> {
        Arc::clone(&self.shared.video)
    }

    pub fn audio_track(&self) -> Option<Arc<dyn AudioTrack>> {
        self.shared.audio.clone()
    }

    /// Container/codec identifier of the encoded output.
    pub fn media_type(&self) -> &str {
        &self.shared.media_type
    }

    /// When the underlying devices were acquired.
    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.shared.acquired_at
    }

    /// Whether the session still holds live devices.
    pub fn is_live(&self) -> bool {
        !self.shared.released.load(Ordering::SeqCst)
            && self.shared.sources.iter().all(|s| s.is_live())
    }

    /// Pull the encoded bytes produced since the previous pull.
    ///
    /// Fails with `DeviceLost` once the session is released or any backing
    /// device disappeared.
    pub fn pull_chunk(&self) -> PipelineResult<Vec<u8>> {
        if !self.is_live() {
            return Err(PipelineError::DeviceLost);
        }
        self.shared.sources[0].pull_chunk()
    }

    /// Enable or disable the outgoing audio track. No-op for sessions
    /// without audio.
    pub fn set_audio_enabled(&self, enabled: bool) {
        if let Some(audio) = &self.shared.audio {
            audio.set_enabled(enabled);
        }
    }

    /// Whether the outgoing audio track is enabled. `false` for sessions
    /// without audio.
    pub fn audio_enabled(&self) -> bool {
        self.shared
            .audio
            .as_ref()
            .map(|a| a.is_enabled())
            .unwrap_or(false)
    }

    /// Stop every underlying device track. Idempotent: a second call, or a
    /// call on an already-released session, is a no-op.
    pub fn release(&self) {
        if !self.shared.released.swap(true, Ordering::SeqCst) {
            tracing::debug!(mode = ?self.shared.mode, "releasing capture session");
            for source in &self.shared.sources {
                source.stop();
            }
        }
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("mode", &self.shared.mode)
            .field("media_type", &self.shared.media_type)
            .field("acquired_at", &self.shared.acquired_at)
            .field("released", &self.shared.released.load(Ordering::SeqCst))
            .finish()
    }
}
