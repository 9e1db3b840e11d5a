//! Signal monitoring
//!
//! Continuous audio-level sampling for "is the mic live" feedback while a
//! recording is in progress.

mod sampler;

pub use sampler::SignalMonitor;
