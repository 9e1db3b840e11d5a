//! Recording pipeline orchestrator
//!
//! Owns the session lifecycle and arbitrates which operations are legal
//! from which state. Every capture, monitoring, recording, snapshot, and
//! egress component is invoked through here; the host never touches them
//! directly.
//!
//! Three periodic activities run while recording: level sampling (signal
//! monitor), chunk collection (recorder engine), and the once-per-second
//! duration timer. The timer is owned by the pipeline and is the sole
//! trigger of the autonomous stop at the duration ceiling. Explicit stop
//! and the timer funnel through one finalize path guarded by the core
//! mutex, so the loser of the race simply observes the state already
//! moved.

use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use super::state::{PipelineConfig, PipelineEvent, SessionState};
use crate::capture::manager::SourceManager;
use crate::capture::session::CaptureSession;
use crate::capture::traits::{CaptureMode, CaptureSourceProvider};
use crate::egress::{self, StorageSink};
use crate::monitor::SignalMonitor;
use crate::recorder::artifact::Artifact;
use crate::recorder::engine::{EngineSignal, RecorderEngine};
use crate::snapshot::{self, Thumbnail};
use crate::utils::error::{ErrorKind, PipelineError, PipelineResult};

const EVENT_CHANNEL_CAPACITY: usize = 100;

fn invalid_state(operation: &'static str, state: SessionState) -> PipelineError {
    PipelineError::InvalidState {
        operation,
        state: state.name(),
    }
}

/// Mutable pipeline core, protected by the state lock
struct Core {
    state: SessionState,
    mode: CaptureMode,
    /// Bumped on every new acquisition and on teardown; completions carrying
    /// a stale generation are dropped instead of acting on a dead session.
    generation: u64,
    session: Option<CaptureSession>,
    engine: Option<RecorderEngine>,
    monitor: Option<SignalMonitor>,
    timer: Option<JoinHandle<()>>,
    signal_listener: Option<JoinHandle<()>>,
    artifact: Option<Arc<Artifact>>,
    thumbnail: Option<Arc<Thumbnail>>,
    last_error: Option<ErrorKind>,
}

impl Core {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
            mode: CaptureMode::default(),
            generation: 0,
            session: None,
            engine: None,
            monitor: None,
            timer: None,
            signal_listener: None,
            artifact: None,
            thumbnail: None,
            last_error: None,
        }
    }

    /// Synchronously stop the periodic activities (timer, signal listener,
    /// monitor). The engine's collector is stopped by finalize/abandon.
    fn stop_periodic_tasks(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(listener) = self.signal_listener.take() {
            listener.abort();
        }
        if let Some(mut monitor) = self.monitor.take() {
            monitor.detach();
        }
    }
}

struct PipelineInner {
    manager: SourceManager,
    sink: Arc<dyn StorageSink>,
    config: PipelineConfig,
    core: Mutex<Core>,
    events: broadcast::Sender<PipelineEvent>,
}

/// The session state machine fronting the whole capture pipeline
///
/// One pipeline instance manages one recording session at a time. Cheap to
/// clone; clones share the same state machine.
#[derive(Clone)]
pub struct RecordingPipeline {
    inner: Arc<PipelineInner>,
}

impl RecordingPipeline {
    pub fn new(
        provider: Arc<dyn CaptureSourceProvider>,
        sink: Arc<dyn StorageSink>,
        config: PipelineConfig,
    ) -> PipelineResult<Self> {
        config.validate().map_err(PipelineError::InvalidConfig)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(PipelineInner {
                manager: SourceManager::new(provider),
                sink,
                config,
                core: Mutex::new(Core::new()),
                events,
            }),
        })
    }

    /// Subscribe to pipeline events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.inner.events.subscribe()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.inner.core.lock().state
    }

    /// Capture mode the next recording will use.
    pub fn mode(&self) -> CaptureMode {
        self.inner.core.lock().mode
    }

    /// The most recent error kind, if any.
    pub fn last_error(&self) -> Option<ErrorKind> {
        self.inner.core.lock().last_error
    }

    /// Elapsed recording time in whole seconds; zero outside recording.
    pub fn elapsed_secs(&self) -> u32 {
        let core = self.inner.core.lock();
        core.engine.as_ref().map(|e| e.elapsed_secs()).unwrap_or(0)
    }

    /// The finalized artifact, while one is held.
    pub fn artifact(&self) -> Option<Arc<Artifact>> {
        self.inner.core.lock().artifact.clone()
    }

    /// The preview thumbnail, while one is held.
    pub fn thumbnail(&self) -> Option<Arc<Thumbnail>> {
        self.inner.core.lock().thumbnail.clone()
    }

    /// Current audio level in `[0, 100]`.
    ///
    /// `None` outside recording, and for sessions without an audio track:
    /// the level is undefined then, not merely zero.
    pub fn audio_level(&self) -> Option<f32> {
        let core = self.inner.core.lock();
        if !core.state.is_recording() {
            return None;
        }
        core.monitor.as_ref().map(|m| m.level())
    }

    /// Live stream of audio level updates for the current recording.
    pub fn level_stream(&self) -> Option<watch::Receiver<f32>> {
        let core = self.inner.core.lock();
        if !core.state.is_recording() {
            return None;
        }
        core.monitor.as_ref().map(|m| m.level_stream())
    }

    /// Choose the capture mode for the next recording.
    ///
    /// Legal while no session is live (`Idle`, `Done`, or `Error`); the
    /// mode is immutable once acquisition begins.
    pub fn select_mode(&self, mode: CaptureMode) -> PipelineResult<()> {
        let mut core = self.inner.core.lock();
        match core.state {
            SessionState::Idle | SessionState::Done | SessionState::Error(_) => {
                core.mode = mode;
                Ok(())
            }
            state => Err(invalid_state("selectMode", state)),
        }
    }

    /// Start a recording session with the selected mode.
    ///
    /// `Idle`/`Done` → `Acquiring`, then `Recording` on success or
    /// `Error` on classified failure. Starting a new recording releases
    /// any previously held artifact.
    pub async fn start_recording(&self) -> PipelineResult<()> {
        let generation = {
            let mut core = self.inner.core.lock();
            if !core.state.can_start() {
                return Err(invalid_state("startRecording", core.state));
            }
            core.artifact = None;
            core.thumbnail = None;
            core.last_error = None;
            core.generation += 1;
            self.inner.set_state(&mut core, SessionState::Acquiring);
            core.generation
        };
        self.acquire_and_begin(generation).await
    }

    /// Re-attempt acquisition after a failure. `Error` → `Acquiring`.
    pub async fn retry(&self) -> PipelineResult<()> {
        let generation = {
            let mut core = self.inner.core.lock();
            if !core.state.is_error() {
                return Err(invalid_state("retry", core.state));
            }
            core.last_error = None;
            core.generation += 1;
            self.inner.set_state(&mut core, SessionState::Acquiring);
            core.generation
        };
        self.acquire_and_begin(generation).await
    }

    async fn acquire_and_begin(&self, generation: u64) -> PipelineResult<()> {
        let mode = self.inner.core.lock().mode;
        let result = self
            .inner
            .manager
            .acquire(mode, self.inner.config.acquire_timeout())
            .await;

        let mut core = self.inner.core.lock();
        if core.generation != generation || core.state != SessionState::Acquiring {
            // The pipeline moved on (teardown) while the prompt was up.
            if let Ok(session) = result {
                session.release();
            }
            return Err(invalid_state("startRecording", core.state));
        }

        let session = match result {
            Ok(session) => session,
            Err(err) => {
                let kind = err.kind();
                tracing::warn!(?mode, ?kind, "acquisition failed");
                core.last_error = Some(kind);
                self.inner.set_state(&mut core, SessionState::Error(kind));
                let _ = self.inner.events.send(PipelineEvent::Error(kind));
                return Err(err);
            }
        };

        tracing::info!(?mode, media_type = session.media_type(), "recording started");
        core.monitor = SignalMonitor::attach(&session, self.inner.config.monitor_interval());
        let (engine, signals) = RecorderEngine::start(
            session.clone(),
            self.inner.config.chunk_cadence(),
            self.inner.config.max_duration_secs,
        );
        core.engine = Some(engine);
        core.session = Some(session);
        core.timer = Some(spawn_duration_timer(
            Arc::downgrade(&self.inner),
            generation,
        ));
        core.signal_listener = Some(spawn_signal_listener(
            Arc::downgrade(&self.inner),
            generation,
            signals,
        ));
        self.inner.set_state(&mut core, SessionState::Recording);
        Ok(())
    }

    /// Toggle the outgoing audio track. Returns the new muted flag.
    ///
    /// The monitor keeps sampling the silent track; the encoded chunks
    /// contain no audible audio while muted.
    pub fn toggle_mute(&self) -> PipelineResult<bool> {
        let core = self.inner.core.lock();
        if !core.state.is_recording() {
            return Err(invalid_state("toggleMute", core.state));
        }
        let session = core
            .session
            .as_ref()
            .ok_or(invalid_state("toggleMute", core.state))?;
        // Muting disables the outgoing track; the device stays held.
        let mute = session.audio_enabled();
        session.set_audio_enabled(!mute);
        tracing::debug!(muted = mute, "toggled outgoing audio");
        Ok(mute)
    }

    /// Stop the recording and finalize it. `Recording` → `Preview`.
    pub fn stop_recording(&self) -> PipelineResult<()> {
        let generation = self.inner.core.lock().generation;
        self.inner.finalize_recording(generation, "stopRecording")
    }

    /// Drop the held artifact and return to `Idle`. `Preview` only.
    pub fn discard(&self) -> PipelineResult<()> {
        let mut core = self.inner.core.lock();
        if core.state != SessionState::Preview {
            return Err(invalid_state("discard", core.state));
        }
        core.artifact = None;
        core.thumbnail = None;
        tracing::info!("artifact discarded");
        self.inner.set_state(&mut core, SessionState::Idle);
        Ok(())
    }

    /// Write the held artifact to a local file. `Preview` only; pure,
    /// repeatable, no state change.
    pub async fn export(&self, path: &Path) -> PipelineResult<()> {
        let artifact = {
            let core = self.inner.core.lock();
            if core.state != SessionState::Preview {
                return Err(invalid_state("export", core.state));
            }
            core.artifact
                .clone()
                .ok_or(invalid_state("export", core.state))?
        };
        egress::export_artifact(&artifact, path).await
    }

    /// Upload the held artifact to the storage sink.
    ///
    /// `Preview` → `Uploading` → `Done` with the locator on success; on
    /// failure the artifact is retained and the state reverts to `Preview`
    /// so the caller can retry without re-recording.
    pub async fn upload(&self) -> PipelineResult<String> {
        let (generation, artifact) = {
            let mut core = self.inner.core.lock();
            if core.state != SessionState::Preview {
                return Err(invalid_state("upload", core.state));
            }
            let artifact = core
                .artifact
                .clone()
                .ok_or(invalid_state("upload", core.state))?;
            self.inner.set_state(&mut core, SessionState::Uploading);
            (core.generation, artifact)
        };

        let result = self.inner.sink.put(&artifact.data, &artifact.media_type).await;

        let mut core = self.inner.core.lock();
        if core.generation != generation || core.state != SessionState::Uploading {
            return Err(invalid_state("upload", core.state));
        }
        match result {
            Ok(locator) => {
                self.inner.set_state(&mut core, SessionState::Done);
                let _ = self.inner.events.send(PipelineEvent::UploadComplete {
                    locator: locator.clone(),
                    thumbnail: core.thumbnail.clone(),
                });
                Ok(locator)
            }
            Err(err) => {
                tracing::warn!(%err, "upload failed, artifact retained");
                core.last_error = Some(ErrorKind::UploadFailed);
                self.inner.set_state(&mut core, SessionState::Preview);
                let _ = self
                    .inner
                    .events
                    .send(PipelineEvent::Error(ErrorKind::UploadFailed));
                Err(err)
            }
        }
    }

    /// Tear the pipeline down from any state: stop every periodic
    /// activity, release the session, drop any held artifact, return to
    /// `Idle`. Safe to call repeatedly.
    pub fn teardown(&self) {
        let mut core = self.inner.core.lock();
        core.generation += 1;
        core.stop_periodic_tasks();
        if let Some(mut engine) = core.engine.take() {
            engine.abandon();
        }
        if let Some(session) = core.session.take() {
            session.release();
        }
        core.artifact = None;
        core.thumbnail = None;
        if core.state != SessionState::Idle {
            self.inner.set_state(&mut core, SessionState::Idle);
        }
    }
}

impl PipelineInner {
    /// Transition and publish, in order, under the state lock.
    fn set_state(&self, core: &mut Core, state: SessionState) {
        tracing::debug!(from = core.state.name(), to = state.name(), "state transition");
        core.state = state;
        let _ = self.events.send(PipelineEvent::StateChanged(state));
    }

    /// The single finalize path shared by explicit stop and the duration
    /// timer. `Recording` → `Preview`.
    fn finalize_recording(
        &self,
        generation: u64,
        operation: &'static str,
    ) -> PipelineResult<()> {
        let mut core = self.core.lock();
        if core.generation != generation || !core.state.is_recording() {
            return Err(invalid_state(operation, core.state));
        }
        core.stop_periodic_tasks();

        let mut engine = core
            .engine
            .take()
            .ok_or(invalid_state(operation, core.state))?;
        let session = core.session.take();

        let artifact = match engine.finalize() {
            Ok(artifact) => artifact,
            Err(err) => {
                if let Some(session) = session {
                    session.release();
                }
                let kind = err.kind();
                core.last_error = Some(kind);
                self.set_state(&mut core, SessionState::Error(kind));
                return Err(err);
            }
        };

        // Thumbnail extraction is best-effort: a session stopped before the
        // first frame simply previews without one.
        let thumbnail = session
            .as_ref()
            .and_then(|s| snapshot::capture(s).ok())
            .map(Arc::new);
        if let Some(session) = session {
            session.release();
        }

        let artifact = Arc::new(artifact);
        core.artifact = Some(Arc::clone(&artifact));
        core.thumbnail = thumbnail.clone();
        self.set_state(&mut core, SessionState::Preview);
        let _ = self.events.send(PipelineEvent::ArtifactReady {
            artifact,
            thumbnail,
        });
        Ok(())
    }

    /// Device loss mid-recording: discard partial chunks, release, surface
    /// the error. `Recording` → `Error`.
    fn fail_recording(&self, generation: u64, kind: ErrorKind) {
        let mut core = self.core.lock();
        if core.generation != generation || !core.state.is_recording() {
            return;
        }
        core.stop_periodic_tasks();
        if let Some(mut engine) = core.engine.take() {
            engine.abandon();
        }
        if let Some(session) = core.session.take() {
            session.release();
        }
        core.last_error = Some(kind);
        self.set_state(&mut core, SessionState::Error(kind));
        let _ = self.events.send(PipelineEvent::Error(kind));
    }
}

impl Drop for PipelineInner {
    fn drop(&mut self) {
        let core = self.core.get_mut();
        core.stop_periodic_tasks();
        if let Some(mut engine) = core.engine.take() {
            engine.abandon();
        }
        if let Some(session) = core.session.take() {
            session.release();
        }
    }
}

/// Once-per-second duration timer: advances the engine's elapsed counter,
/// publishes progress, and triggers the autonomous stop at the ceiling.
fn spawn_duration_timer(inner: Weak<PipelineInner>, generation: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // Skip the immediate first tick.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else { break };
            let ticked = {
                let core = inner.core.lock();
                if core.generation != generation || !core.state.is_recording() {
                    break;
                }
                core.engine
                    .as_ref()
                    .map(|engine| (engine.tick_second(), engine.elapsed_secs()))
            };
            let Some((ceiling_reached, elapsed_secs)) = ticked else {
                break;
            };
            let _ = inner
                .events
                .send(PipelineEvent::Progress { elapsed_secs });
            if ceiling_reached {
                tracing::info!(elapsed_secs, "duration ceiling reached, stopping");
                let _ = inner.finalize_recording(generation, "stopRecording");
                break;
            }
        }
    })
}

/// Listens for out-of-band engine signals (device loss).
fn spawn_signal_listener(
    inner: Weak<PipelineInner>,
    generation: u64,
    mut signals: mpsc::UnboundedReceiver<EngineSignal>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(signal) = signals.recv().await {
            let Some(inner) = inner.upgrade() else { break };
            match signal {
                EngineSignal::DeviceLost => {
                    inner.fail_recording(generation, ErrorKind::DeviceLost);
                    break;
                }
            }
        }
    })
}
