//! Recording engine module
//!
//! Chunk collection at a fixed cadence, the elapsed-time counter with its
//! hard duration ceiling, and finalization into an [`Artifact`].

pub mod artifact;
pub mod engine;

pub use artifact::{Artifact, ArtifactMetadata};
pub use engine::{EngineSignal, RecorderEngine};
