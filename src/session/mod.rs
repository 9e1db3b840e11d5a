//! Session lifecycle
//!
//! The state machine that owns a recording session from acquisition to
//! egress, plus its configuration and event types.

pub mod pipeline;
pub mod state;

pub use pipeline::RecordingPipeline;
pub use state::{PipelineConfig, PipelineEvent, SessionState};
