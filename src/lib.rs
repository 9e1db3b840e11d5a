//! Client-side media capture and recording pipeline.
//!
//! Acquires live camera/screen capture sources through a platform provider,
//! composes them into one session, samples the audio signal for live level
//! feedback, accumulates encoded media chunks under a hard duration
//! ceiling, finalizes into a single artifact with a PNG thumbnail, and
//! offers discard / local-export / remote-upload on the result.
//!
//! ## Architecture
//!
//! ```text
//! capture/   ← CaptureSourceProvider seam, per-mode source composition
//! monitor/   ← live audio level sampling (watch stream)
//! recorder/  ← chunk collection, duration ceiling, Artifact finalization
//! snapshot/  ← still-frame PNG thumbnail extraction
//! session/   ← the state machine orchestrating all of the above
//! egress/    ← local export and StorageSink upload
//! ```
//!
//! Hosts drive everything through [`RecordingPipeline`] and observe it via
//! its broadcast [`PipelineEvent`] stream; the platform plugs in below via
//! [`CaptureSourceProvider`] and [`StorageSink`].

pub mod capture;
pub mod egress;
pub mod monitor;
pub mod recorder;
pub mod session;
pub mod snapshot;
pub mod utils;

pub use capture::{
    AudioTrack, CaptureMode, CaptureRequest, CaptureSession, CaptureSource,
    CaptureSourceProvider, DeviceClass, SourceManager, VideoFrame, VideoTrack,
};
pub use egress::{HttpStorageSink, StorageSink};
pub use monitor::SignalMonitor;
pub use recorder::{Artifact, ArtifactMetadata, RecorderEngine};
pub use session::{PipelineConfig, PipelineEvent, RecordingPipeline, SessionState};
pub use snapshot::Thumbnail;
pub use utils::error::{ErrorKind, PipelineError, PipelineResult};
