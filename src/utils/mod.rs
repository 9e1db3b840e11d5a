//! Shared utilities

pub mod error;

pub use error::{ErrorKind, PipelineError, PipelineResult};
