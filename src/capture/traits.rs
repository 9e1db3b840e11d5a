//! Capture trait definitions
//!
//! Platform-agnostic traits for capture sources. A platform backend (native
//! OS capture API, media framework binding, or a browser-hosted variant)
//! implements [`CaptureSourceProvider`] and the track traits; everything
//! above the provider seam is platform-agnostic.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error::PipelineResult;

/// What a recording session captures
///
/// Selected before acquisition and immutable for the session once
/// acquisition begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureMode {
    /// Front-facing camera video plus its microphone audio
    Camera,

    /// Screen/window share video plus share audio
    Screen,

    /// Screen-share video combined with the camera's microphone audio.
    ///
    /// The camera's own video track is deliberately dropped in this mode:
    /// only one video track is carried downstream. This mirrors the
    /// composition the pre-check widget ships with and is intentional, not
    /// an oversight.
    ScreenWithCameraAudio,
}

impl Default for CaptureMode {
    fn default() -> Self {
        Self::Camera
    }
}

/// Which device class an acquisition targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceClass {
    /// A local camera input device
    CameraDevice,
    /// A screen/window share (goes through the platform share prompt)
    ScreenShare,
}

/// A single acquisition request handed to a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    /// Device class to acquire
    pub device: DeviceClass,

    /// Whether the source should carry an audio track
    pub with_audio: bool,
}

/// One decoded RGBA8 video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Tightly packed RGBA8 pixel data, `width * height * 4` bytes
    pub rgba: Vec<u8>,
}

/// A live video track of a capture source
pub trait VideoTrack: Send + Sync {
    /// Most recent decoded frame, if any has arrived yet.
    fn latest_frame(&self) -> Option<VideoFrame>;

    /// Whether the underlying device is still delivering frames.
    fn is_live(&self) -> bool;
}

/// A live audio track of a capture source
pub trait AudioTrack: Send + Sync {
    /// Magnitudes of the current frequency-domain sample window, each in
    /// `[0, 1]`. Empty while no audio has arrived.
    fn spectrum(&self) -> Vec<f32>;

    /// Enable or disable the outgoing track. A disabled track produces
    /// silence in the encoded output; the device stays held.
    fn set_enabled(&self, enabled: bool);

    /// Whether the outgoing track is currently enabled.
    fn is_enabled(&self) -> bool;

    /// Whether the underlying device is still delivering samples.
    fn is_live(&self) -> bool;
}

/// A live platform capture source (one camera or one screen share)
///
/// While a source exists the underlying hardware is actively held (camera
/// light on, share indicator visible). Implementations must stop the device
/// on [`CaptureSource::stop`] and again on drop, both idempotently.
pub trait CaptureSource: Send + Sync {
    /// The source's video track, if it carries one.
    fn video_track(&self) -> Option<Arc<dyn VideoTrack>>;

    /// The source's audio track, if it carries one.
    fn audio_track(&self) -> Option<Arc<dyn AudioTrack>>;

    /// Encoded container bytes produced since the previous pull.
    ///
    /// The source's encoder muxes whatever tracks the session routed into
    /// it and honors track enablement: a disabled audio track encodes as
    /// silence.
    fn pull_chunk(&self) -> PipelineResult<Vec<u8>>;

    /// Container/codec identifier for the encoded chunks
    /// (e.g. `video/webm;codecs=vp8,opus`).
    fn media_type(&self) -> String;

    /// Whether the underlying device is still attached and delivering.
    fn is_live(&self) -> bool;

    /// Stop the underlying device and release the hardware hold.
    /// Idempotent.
    fn stop(&self);
}

/// Platform seam: acquires live capture sources
///
/// Failures must be classified as `PermissionDenied` (user/OS declined)
/// versus `DeviceUnavailable` (no such device, share prompt cancelled); the
/// distinction is preserved all the way to the host for messaging.
#[async_trait]
pub trait CaptureSourceProvider: Send + Sync {
    /// Acquire one live source. May prompt the user; resolves only once the
    /// platform grants or refuses access.
    async fn acquire(&self, request: CaptureRequest) -> PipelineResult<Box<dyn CaptureSource>>;
}
