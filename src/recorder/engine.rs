//! Recorder engine
//!
//! Collects encoded media chunks from a live capture session at a fixed
//! cadence, tracks elapsed recording time against a hard ceiling, and
//! finalizes the chunk buffer into one [`Artifact`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::artifact::Artifact;
use crate::capture::session::CaptureSession;
use crate::utils::error::{PipelineError, PipelineResult};

/// Out-of-band condition raised by the chunk-collection task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSignal {
    /// The session's underlying device disappeared mid-recording.
    DeviceLost,
}

/// Chunk buffer plus elapsed-time accounting, shared with the collector
/// task. Both the periodic collector and an explicit finalize may race, so
/// every access goes through the mutex.
struct EngineInner {
    chunks: Vec<Vec<u8>>,
    elapsed_secs: u32,
    max_duration_secs: u32,
    stopped: bool,
}

/// Consumes a composed session and accumulates encoded chunks
///
/// The chunk cadence is fixed per session (one chunk per cadence tick); the
/// reference cadence is one second, trading minimal overhead against at
/// most one cadence of loss if the process dies mid-recording.
pub struct RecorderEngine {
    inner: Arc<Mutex<EngineInner>>,
    session: CaptureSession,
    collector: Option<JoinHandle<()>>,
}

impl RecorderEngine {
    /// Start collecting chunks from `session`.
    ///
    /// Returns the engine plus a receiver for out-of-band signals
    /// (currently only device loss).
    pub fn start(
        session: CaptureSession,
        cadence: Duration,
        max_duration_secs: u32,
    ) -> (Self, mpsc::UnboundedReceiver<EngineSignal>) {
        let inner = Arc::new(Mutex::new(EngineInner {
            chunks: Vec::new(),
            elapsed_secs: 0,
            max_duration_secs,
            stopped: false,
        }));
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        let collector = tokio::spawn(collect_loop(
            session.clone(),
            cadence,
            Arc::clone(&inner),
            signal_tx,
        ));

        tracing::info!(
            ?cadence,
            max_duration_secs,
            media_type = session.media_type(),
            "recorder engine started"
        );

        (
            Self {
                inner,
                session,
                collector: Some(collector),
            },
            signal_rx,
        )
    }

    /// Elapsed recording time in whole seconds.
    pub fn elapsed_secs(&self) -> u32 {
        self.inner.lock().elapsed_secs
    }

    /// Advance the elapsed counter by one second of wall-clock recording.
    ///
    /// Returns `true` once the duration ceiling is reached. The counter
    /// saturates at the ceiling: the engine will not count past it even if
    /// the caller keeps ticking.
    pub fn tick_second(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.stopped {
            return false;
        }
        if inner.elapsed_secs < inner.max_duration_secs {
            inner.elapsed_secs += 1;
        }
        inner.elapsed_secs >= inner.max_duration_secs
    }

    /// Stop collection and concatenate all chunks into one artifact.
    ///
    /// The chunk buffer is consumed; a second call returns
    /// `AlreadyStopped`.
    pub fn finalize(&mut self) -> PipelineResult<Artifact> {
        if let Some(collector) = self.collector.take() {
            collector.abort();
        }
        let mut inner = self.inner.lock();
        if inner.stopped {
            return Err(PipelineError::AlreadyStopped);
        }
        inner.stopped = true;
        let chunks = std::mem::take(&mut inner.chunks);
        let data = chunks.concat();
        tracing::info!(
            chunks = chunks.len(),
            bytes = data.len(),
            duration_secs = inner.elapsed_secs,
            "recording finalized"
        );
        Ok(Artifact::new(
            data,
            self.session.media_type().to_string(),
            inner.elapsed_secs,
        ))
    }

    /// Stop collection and discard all chunks collected so far.
    ///
    /// Used on device loss: partial artifacts are never exposed.
    pub fn abandon(&mut self) {
        if let Some(collector) = self.collector.take() {
            collector.abort();
        }
        let mut inner = self.inner.lock();
        let discarded = inner.chunks.len();
        inner.chunks.clear();
        inner.stopped = true;
        if discarded > 0 {
            tracing::warn!(discarded, "discarding partial recording");
        }
    }
}

impl Drop for RecorderEngine {
    fn drop(&mut self) {
        if let Some(collector) = self.collector.take() {
            collector.abort();
        }
    }
}

async fn collect_loop(
    session: CaptureSession,
    cadence: Duration,
    inner: Arc<Mutex<EngineInner>>,
    signal_tx: mpsc::UnboundedSender<EngineSignal>,
) {
    let mut ticker = tokio::time::interval(cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first interval tick completes immediately; skip it so the first
    // chunk covers a full cadence window.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match session.pull_chunk() {
            Ok(chunk) => {
                let mut guard = inner.lock();
                if guard.stopped {
                    break;
                }
                guard.chunks.push(chunk);
            }
            Err(err) => {
                tracing::warn!(%err, "chunk pull failed, signalling device loss");
                let _ = signal_tx.send(EngineSignal::DeviceLost);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::capture::traits::{
        AudioTrack, CaptureMode, CaptureSource, VideoFrame, VideoTrack,
    };

    struct TestVideo;

    impl VideoTrack for TestVideo {
        fn latest_frame(&self) -> Option<VideoFrame> {
            None
        }
        fn is_live(&self) -> bool {
            true
        }
    }

    struct TestSource {
        live: Arc<AtomicBool>,
        pulls: AtomicUsize,
    }

    impl CaptureSource for TestSource {
        fn video_track(&self) -> Option<Arc<dyn VideoTrack>> {
            Some(Arc::new(TestVideo))
        }
        fn audio_track(&self) -> Option<Arc<dyn AudioTrack>> {
            None
        }
        fn pull_chunk(&self) -> PipelineResult<Vec<u8>> {
            if !self.live.load(Ordering::SeqCst) {
                return Err(PipelineError::DeviceLost);
            }
            let n = self.pulls.fetch_add(1, Ordering::SeqCst) as u8;
            Ok(vec![n; 4])
        }
        fn media_type(&self) -> String {
            "video/webm".into()
        }
        fn is_live(&self) -> bool {
            self.live.load(Ordering::SeqCst)
        }
        fn stop(&self) {
            self.live.store(false, Ordering::SeqCst);
        }
    }

    fn test_session(live: Arc<AtomicBool>) -> CaptureSession {
        let source = TestSource {
            live,
            pulls: AtomicUsize::new(0),
        };
        let video = source.video_track().unwrap();
        CaptureSession::new(CaptureMode::Camera, vec![Box::new(source)], video, None)
    }

    #[tokio::test(start_paused = true)]
    async fn collects_one_chunk_per_cadence_tick() {
        let live = Arc::new(AtomicBool::new(true));
        let (mut engine, _signals) =
            RecorderEngine::start(test_session(live), Duration::from_secs(1), 60);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        let artifact = engine.finalize().unwrap();
        // Ticks at t=1s, 2s, 3s → three 4-byte chunks.
        assert_eq!(artifact.data.len(), 12);
        assert_eq!(&artifact.data[0..4], &[0, 0, 0, 0]);
        assert_eq!(&artifact.data[8..12], &[2, 2, 2, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn finalize_twice_is_already_stopped() {
        let live = Arc::new(AtomicBool::new(true));
        let (mut engine, _signals) =
            RecorderEngine::start(test_session(live), Duration::from_secs(1), 60);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        engine.finalize().unwrap();
        assert!(matches!(
            engine.finalize(),
            Err(PipelineError::AlreadyStopped)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_counter_saturates_at_ceiling() {
        let live = Arc::new(AtomicBool::new(true));
        let (engine, _signals) =
            RecorderEngine::start(test_session(live), Duration::from_secs(1), 3);

        assert!(!engine.tick_second());
        assert!(!engine.tick_second());
        assert!(engine.tick_second());
        // Extra ticks report the ceiling without counting past it.
        assert!(engine.tick_second());
        assert_eq!(engine.elapsed_secs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn device_loss_raises_a_signal() {
        let live = Arc::new(AtomicBool::new(true));
        let (_engine, mut signals) =
            RecorderEngine::start(test_session(Arc::clone(&live)), Duration::from_secs(1), 60);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        live.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(signals.try_recv().ok(), Some(EngineSignal::DeviceLost));
    }
}
