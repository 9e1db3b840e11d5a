//! Test doubles for the capture and storage seams.
//!
//! `FakeDeviceFarm` stands in for the platform: it counts device holds,
//! can drop all devices mid-recording, and controls the frames/spectra the
//! fake tracks deliver. Chunks pulled from a fake source carry a one-byte
//! marker per byte recording whether the audio track was enabled at pull
//! time, which lets tests assert on muted intervals.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use capture_pipeline::{
    AudioTrack, CaptureRequest, CaptureSource, CaptureSourceProvider, ErrorKind, PipelineError,
    PipelineResult, StorageSink, VideoFrame, VideoTrack,
};

pub const CHUNK_LEN: usize = 8;
pub const AUDIBLE: u8 = 0x01;
pub const SILENT: u8 = 0x00;

/// Shared knobs for every device the fake provider hands out.
pub struct FakeDeviceFarm {
    holds: AtomicUsize,
    live: AtomicBool,
    frame: Mutex<Option<VideoFrame>>,
    spectrum: Mutex<Vec<f32>>,
}

impl FakeDeviceFarm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            holds: AtomicUsize::new(0),
            live: AtomicBool::new(true),
            frame: Mutex::new(Some(VideoFrame {
                width: 2,
                height: 2,
                rgba: vec![0xff; 2 * 2 * 4],
            })),
            spectrum: Mutex::new(vec![0.5; 8]),
        })
    }

    pub fn holds(&self) -> usize {
        self.holds.load(Ordering::SeqCst)
    }

    /// Simulate every device disappearing (cable pulled).
    pub fn kill_devices(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    /// Make the video track deliver no frames at all.
    pub fn clear_frames(&self) {
        *self.frame.lock() = None;
    }

    pub fn set_spectrum(&self, magnitudes: Vec<f32>) {
        *self.spectrum.lock() = magnitudes;
    }
}

struct FakeVideoTrack {
    farm: Arc<FakeDeviceFarm>,
}

impl VideoTrack for FakeVideoTrack {
    fn latest_frame(&self) -> Option<VideoFrame> {
        self.farm.frame.lock().clone()
    }
    fn is_live(&self) -> bool {
        self.farm.live.load(Ordering::SeqCst)
    }
}

struct FakeAudioTrack {
    farm: Arc<FakeDeviceFarm>,
    enabled: AtomicBool,
}

impl AudioTrack for FakeAudioTrack {
    fn spectrum(&self) -> Vec<f32> {
        self.farm.spectrum.lock().clone()
    }
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
    fn is_live(&self) -> bool {
        self.farm.live.load(Ordering::SeqCst)
    }
}

struct FakeSource {
    farm: Arc<FakeDeviceFarm>,
    video: Arc<FakeVideoTrack>,
    audio: Option<Arc<FakeAudioTrack>>,
    stopped: AtomicBool,
}

impl FakeSource {
    fn new(request: CaptureRequest, farm: Arc<FakeDeviceFarm>) -> Self {
        farm.holds.fetch_add(1, Ordering::SeqCst);
        Self {
            video: Arc::new(FakeVideoTrack {
                farm: Arc::clone(&farm),
            }),
            audio: request.with_audio.then(|| {
                Arc::new(FakeAudioTrack {
                    farm: Arc::clone(&farm),
                    enabled: AtomicBool::new(true),
                })
            }),
            farm,
            stopped: AtomicBool::new(false),
        }
    }
}

impl CaptureSource for FakeSource {
    fn video_track(&self) -> Option<Arc<dyn VideoTrack>> {
        Some(Arc::clone(&self.video) as Arc<dyn VideoTrack>)
    }
    fn audio_track(&self) -> Option<Arc<dyn AudioTrack>> {
        self.audio.clone().map(|a| a as Arc<dyn AudioTrack>)
    }
    fn pull_chunk(&self) -> PipelineResult<Vec<u8>> {
        if !self.is_live() {
            return Err(PipelineError::DeviceLost);
        }
        let marker = match &self.audio {
            Some(audio) if audio.is_enabled() => AUDIBLE,
            _ => SILENT,
        };
        Ok(vec![marker; CHUNK_LEN])
    }
    fn media_type(&self) -> String {
        "video/webm;codecs=vp8,opus".into()
    }
    fn is_live(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst) && self.farm.live.load(Ordering::SeqCst)
    }
    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.farm.holds.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for FakeSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Capture provider test double with scriptable failures.
pub struct FakeProvider {
    farm: Arc<FakeDeviceFarm>,
    fail_next: Mutex<Option<ErrorKind>>,
}

impl FakeProvider {
    pub fn new(farm: Arc<FakeDeviceFarm>) -> Self {
        Self {
            farm,
            fail_next: Mutex::new(None),
        }
    }

    /// Fail the next acquisition with the given classification.
    pub fn fail_next(&self, kind: ErrorKind) {
        *self.fail_next.lock() = Some(kind);
    }
}

#[async_trait]
impl CaptureSourceProvider for FakeProvider {
    async fn acquire(&self, request: CaptureRequest) -> PipelineResult<Box<dyn CaptureSource>> {
        if let Some(kind) = self.fail_next.lock().take() {
            return Err(match kind {
                ErrorKind::PermissionDenied => PipelineError::PermissionDenied,
                _ => PipelineError::DeviceUnavailable,
            });
        }
        Ok(Box::new(FakeSource::new(request, Arc::clone(&self.farm))))
    }
}

/// Storage sink test double recording every put.
pub struct FakeSink {
    puts: Mutex<Vec<(usize, String)>>,
    fail_next: AtomicBool,
}

impl FakeSink {
    pub fn new() -> Self {
        Self {
            puts: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().len()
    }

    pub fn last_put(&self) -> Option<(usize, String)> {
        self.puts.lock().last().cloned()
    }
}

#[async_trait]
impl StorageSink for FakeSink {
    async fn put(&self, data: &[u8], media_type: &str) -> PipelineResult<String> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PipelineError::UploadFailed("injected failure".into()));
        }
        let mut puts = self.puts.lock();
        puts.push((data.len(), media_type.to_string()));
        Ok(format!("mem://artifacts/{}", puts.len()))
    }
}
