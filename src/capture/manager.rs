//! Capture source acquisition and composition
//!
//! [`SourceManager`] turns a [`CaptureMode`] into one composed
//! [`CaptureSession`], acquiring the underlying sources through the
//! platform provider and bounding the whole acquisition — including any
//! permission prompt — with a timeout.

use std::sync::Arc;
use std::time::Duration;

use super::session::CaptureSession;
use super::traits::{CaptureMode, CaptureRequest, CaptureSourceProvider, DeviceClass};
use crate::utils::error::{PipelineError, PipelineResult};

/// Acquires and composes capture sources for a recording session
pub struct SourceManager {
    provider: Arc<dyn CaptureSourceProvider>,
}

impl SourceManager {
    pub fn new(provider: Arc<dyn CaptureSourceProvider>) -> Self {
        Self { provider }
    }

    /// Acquire a composed session for `mode`, bounded by `timeout` so a
    /// hung permission prompt cannot wedge the caller indefinitely.
    ///
    /// On timeout the pending acquisition future is dropped; providers
    /// release any partially acquired device on drop.
    pub async fn acquire(
        &self,
        mode: CaptureMode,
        timeout: Duration,
    ) -> PipelineResult<CaptureSession> {
        tracing::info!(?mode, "acquiring capture sources");
        match tokio::time::timeout(timeout, self.acquire_inner(mode)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(?mode, ?timeout, "capture acquisition timed out");
                Err(PipelineError::AcquisitionTimeout)
            }
        }
    }

    async fn acquire_inner(&self, mode: CaptureMode) -> PipelineResult<CaptureSession> {
        match mode {
            CaptureMode::Camera => {
                self.single_source(
                    mode,
                    CaptureRequest {
                        device: DeviceClass::CameraDevice,
                        with_audio: true,
                    },
                )
                .await
            }
            CaptureMode::Screen => {
                self.single_source(
                    mode,
                    CaptureRequest {
                        device: DeviceClass::ScreenShare,
                        with_audio: true,
                    },
                )
                .await
            }
            CaptureMode::ScreenWithCameraAudio => self.screen_with_camera_audio().await,
        }
    }

    async fn single_source(
        &self,
        mode: CaptureMode,
        request: CaptureRequest,
    ) -> PipelineResult<CaptureSession> {
        let source = self.provider.acquire(request).await?;
        let video = source.video_track().ok_or(PipelineError::DeviceUnavailable)?;
        let audio = source.audio_track();
        Ok(CaptureSession::new(mode, vec![source], video, audio))
    }

    /// Acquire a screen share and a camera concurrently, then compose a
    /// session carrying the screen's video and the camera's microphone.
    /// The camera's own video track is dropped by design.
    async fn screen_with_camera_audio(&self) -> PipelineResult<CaptureSession> {
        let (screen, camera) = tokio::join!(
            self.provider.acquire(CaptureRequest {
                device: DeviceClass::ScreenShare,
                with_audio: false,
            }),
            self.provider.acquire(CaptureRequest {
                device: DeviceClass::CameraDevice,
                with_audio: true,
            }),
        );

        // If one acquisition failed, the one that succeeded must not stay
        // held behind the caller's back.
        let (screen, camera) = match (screen, camera) {
            (Ok(screen), Ok(camera)) => (screen, camera),
            (Ok(screen), Err(err)) => {
                screen.stop();
                return Err(err);
            }
            (Err(err), Ok(camera)) => {
                camera.stop();
                return Err(err);
            }
            (Err(err), Err(_)) => return Err(err),
        };

        let video = screen.video_track().ok_or_else(|| {
            screen.stop();
            camera.stop();
            PipelineError::DeviceUnavailable
        })?;
        let audio = camera.audio_track();

        // Screen first: it is the primary source producing the chunks.
        Ok(CaptureSession::new(
            CaptureMode::ScreenWithCameraAudio,
            vec![screen, camera],
            video,
            audio,
        ))
    }
}
