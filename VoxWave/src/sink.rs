//! Local playout sink
//!
//! Stands in for the voice-call transport during bench operation: playout
//! duration is derived from the PCM file size and the fixed stream format,
//! and a [`SinkEvent::PlayoutEnded`] is raised once per exhaustion, exactly
//! like a real transport draining the input.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use voxcore::{AudioSink, Error, Result, SinkEvent, StreamFormat};

struct PlayoutState {
    input: Option<PathBuf>,
    /// Full duration of the current input
    total: Duration,
    /// Duration left when paused
    remaining: Duration,
    started: Option<Instant>,
    timer: Option<JoinHandle<()>>,
    volume: u16,
}

/// Sink that simulates playout with a timer over the PCM byte rate
pub struct LocalPlayoutSink {
    format: StreamFormat,
    events: mpsc::Sender<SinkEvent>,
    connected: AtomicBool,
    state: Arc<Mutex<PlayoutState>>,
}

impl LocalPlayoutSink {
    pub fn new(format: StreamFormat, events: mpsc::Sender<SinkEvent>) -> Self {
        Self {
            format,
            events,
            connected: AtomicBool::new(false),
            state: Arc::new(Mutex::new(PlayoutState {
                input: None,
                total: Duration::ZERO,
                remaining: Duration::ZERO,
                started: None,
                timer: None,
                volume: 100,
            })),
        }
    }

    fn cancel_timer(state: &mut PlayoutState) {
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.started = None;
    }

    fn start_timer(&self, state: &mut PlayoutState, duration: Duration) {
        Self::cancel_timer(state);
        state.remaining = duration;
        state.started = Some(Instant::now());

        let events = self.events.clone();
        let shared = Arc::clone(&self.state);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            {
                let mut state = shared.lock().unwrap();
                state.timer = None;
                state.started = None;
                state.remaining = Duration::ZERO;
            }
            let _ = events.send(SinkEvent::PlayoutEnded).await;
        }));
    }
}

#[async_trait]
impl AudioSink for LocalPlayoutSink {
    async fn start(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if state.timer.is_none() && state.total > Duration::ZERO {
            let duration = state.total;
            self.start_timer(&mut state, duration);
        }
        info!(volume = state.volume, "Playout attached");
        Ok(())
    }

    async fn stop_playout(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::cancel_timer(&mut state);
        state.remaining = Duration::ZERO;
        debug!("Playout stopped");
        Ok(())
    }

    async fn restart_playout(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.input.is_none() {
            return Err(Error::sink("no input to replay"));
        }
        let duration = state.total;
        self.start_timer(&mut state, duration);
        debug!("Playout restarted from the beginning");
        Ok(())
    }

    async fn set_input(&self, path: &Path) -> Result<()> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::sink(format!("cannot read input {}: {e}", path.display())))?;
        let seconds = metadata.len() as f64 / self.format.bytes_per_second() as f64;
        let duration = Duration::from_secs_f64(seconds);

        let mut state = self.state.lock().unwrap();
        state.input = Some(path.to_path_buf());
        state.total = duration;
        if self.connected.load(Ordering::SeqCst) {
            self.start_timer(&mut state, duration);
        }
        info!(input = %path.display(), seconds, "Playout input set");
        Ok(())
    }

    async fn set_volume(&self, percent: u16) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.volume = percent;
        debug!(percent, "Volume set");
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let elapsed = state.started.map(|s| s.elapsed()).unwrap_or_default();
        let remaining = state.remaining.saturating_sub(elapsed);
        Self::cancel_timer(&mut state);
        state.remaining = remaining;
        debug!(remaining_ms = remaining.as_millis() as u64, "Playout paused");
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let remaining = state.remaining;
        self.start_timer(&mut state, remaining);
        debug!("Playout resumed");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn leave(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        Self::cancel_timer(&mut state);
        info!("Playout detached");
        Ok(())
    }

    async fn rejoin(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        info!("Playout re-attached");
        Ok(())
    }
}
