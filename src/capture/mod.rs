//! Capture source management
//!
//! Acquires one or more live audio/video sources (camera, screen share, or
//! both) through a platform provider and exposes them as a single composed
//! [`CaptureSession`].

pub mod manager;
pub mod session;
pub mod traits;

pub use manager::SourceManager;
pub use session::CaptureSession;
pub use traits::{
    AudioTrack, CaptureMode, CaptureRequest, CaptureSource, CaptureSourceProvider, DeviceClass,
    VideoFrame, VideoTrack,
};
