//! Live audio level sampling
//!
//! Runs a fast sampling loop against a session's audio track and publishes
//! a normalized loudness level through a `watch` channel. The loop runs at
//! animation-frame rate so the meter does not perceptibly lag real speech.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::capture::session::CaptureSession;
use crate::capture::traits::AudioTrack;

/// Samples an audio track and publishes a `[0, 100]` loudness level
///
/// Detached (and the sampling task stopped) on [`SignalMonitor::detach`] or
/// on drop; leaving the loop running past the session is a resource leak,
/// not an option.
pub struct SignalMonitor {
    task: Option<JoinHandle<()>>,
    level_rx: watch::Receiver<f32>,
}

impl SignalMonitor {
    /// Attach to the session's audio track.
    ///
    /// Returns `None` when the session carries no audio; the level is
    /// undefined for such sessions, not merely zero.
    pub fn attach(session: &CaptureSession, interval: Duration) -> Option<Self> {
        let track = session.audio_track()?;
        let (level_tx, level_rx) = watch::channel(0.0f32);
        let task = tokio::spawn(sample_loop(track, interval, level_tx));
        tracing::debug!(?interval, "signal monitor attached");
        Some(Self {
            task: Some(task),
            level_rx,
        })
    }

    /// A live stream of level updates for UI consumption.
    pub fn level_stream(&self) -> watch::Receiver<f32> {
        self.level_rx.clone()
    }

    /// The most recently computed level.
    pub fn level(&self) -> f32 {
        *self.level_rx.borrow()
    }

    /// Stop the sampling loop.
    pub fn detach(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("signal monitor detached");
        }
    }
}

impl Drop for SignalMonitor {
    fn drop(&mut self) {
        self.detach();
    }
}

async fn sample_loop(
    track: Arc<dyn AudioTrack>,
    interval: Duration,
    level_tx: watch::Sender<f32>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        if !track.is_live() {
            break;
        }
        let level = level_from_spectrum(&track.spectrum());
        if level_tx.send(level).is_err() {
            break;
        }
    }
}

/// Mean magnitude of a frequency-domain window, scaled to `[0, 100]`.
///
/// Louder input yields strictly higher means, so the reported level is
/// monotone in loudness and bounded by construction.
pub(crate) fn level_from_spectrum(magnitudes: &[f32]) -> f32 {
    if magnitudes.is_empty() {
        return 0.0;
    }
    let mean: f32 = magnitudes.iter().sum::<f32>() / magnitudes.len() as f32;
    (mean * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_is_silent() {
        assert_eq!(level_from_spectrum(&[]), 0.0);
    }

    #[test]
    fn level_is_monotone_in_loudness() {
        let quiet = level_from_spectrum(&[0.1, 0.1, 0.1, 0.1]);
        let loud = level_from_spectrum(&[0.6, 0.7, 0.8, 0.9]);
        assert!(loud > quiet);
    }

    #[test]
    fn level_is_bounded() {
        // Out-of-range magnitudes still clamp into [0, 100].
        let level = level_from_spectrum(&[2.0, 3.0, 4.0]);
        assert_eq!(level, 100.0);
        assert!(level_from_spectrum(&[0.0; 16]) >= 0.0);
    }

    #[test]
    fn full_scale_window_pegs_the_meter() {
        let level = level_from_spectrum(&[1.0; 32]);
        assert!((level - 100.0).abs() < f32::EPSILON);
    }
}
