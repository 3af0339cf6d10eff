//! Session controller: the single state machine all commands and sink
//! events go through
//!
//! Every transition is serialized behind one async mutex; fetch and
//! transcode run on a spawned task that re-acquires the lock to apply its
//! result. A generation counter incremented on every load decides races
//! deterministically: a result whose generation is no longer current is
//! discarded, so a stale stream never reaches the sink.

use crate::catalog::CatalogClient;
use crate::command::{Command, Reply};
use crate::error::{Error, Result};
use crate::model::{PlayMode, StreamHandle, Track};
use crate::pipeline::PlaybackPipeline;
use crate::session::{ActiveTrack, RadioSession};
use crate::sink::{AudioSink, MAX_VOLUME, MIN_VOLUME};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Controller phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No stream loaded, sink quiescent
    Idle,
    /// Download/transcode in progress
    Loading,
    /// Sink actively reading
    Streaming,
    /// Sink suspended, same track loaded
    Paused,
}

/// How the loaded stream gets its session activation
enum Activation {
    /// RadioSession already activated the track (advance/start_radio path)
    Advanced,
    /// Activate after the stream is ready (query path)
    Direct(Track),
}

struct LoadingJob {
    generation: u64,
    handle: JoinHandle<()>,
}

struct ControllerState {
    session: RadioSession,
    phase: Phase,
    mode: PlayMode,
    replay_lock: bool,
    generation: u64,
    loading: Option<LoadingJob>,
}

/// Read-only view of the controller for status queries and tests
#[derive(Debug, Clone)]
pub struct ControllerSnapshot {
    pub phase: Phase,
    pub mode: PlayMode,
    pub replay_lock: bool,
    pub current: Option<ActiveTrack>,
}

/// The state machine binding commands and sink events to
/// [`RadioSession`]/[`PlaybackPipeline`] calls
pub struct SessionController {
    state: Mutex<ControllerState>,
    pipeline: Arc<PlaybackPipeline>,
    sink: Arc<dyn AudioSink>,
}

impl SessionController {
    /// Build a controller over injected collaborators
    pub fn new(
        session: RadioSession,
        pipeline: Arc<PlaybackPipeline>,
        sink: Arc<dyn AudioSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ControllerState {
                session,
                phase: Phase::Idle,
                mode: PlayMode::Fresh,
                replay_lock: false,
                generation: 0,
                loading: None,
            }),
            pipeline,
            sink,
        })
    }

    /// Dispatch one operator command
    pub async fn handle(self: &Arc<Self>, command: Command) -> Result<Reply> {
        debug!(?command, "handling command");
        match command {
            Command::Play(Some(query)) => self.play_query(&query).await,
            Command::Play(None) => self.play_wave().await,
            Command::Skip => self.skip().await,
            Command::Stop => self.stop().await,
            Command::Pause => self.pause().await,
            Command::Resume => self.resume().await,
            Command::Replay => self.replay().await,
            Command::SetVolume(volume) => self.set_volume(volume).await,
            Command::Join => {
                self.sink.start().await?;
                Ok(Reply::Joined)
            }
            Command::Leave => {
                self.sink.leave().await?;
                Ok(Reply::Left)
            }
            Command::Rejoin => {
                self.sink.rejoin().await?;
                Ok(Reply::Rejoined)
            }
            Command::NowPlaying => self.now_playing().await,
        }
    }

    /// Consume one edge-triggered playout-ended notification from the sink
    pub async fn on_playout_ended(self: &Arc<Self>) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.phase != Phase::Streaming {
            debug!(phase = ?state.phase, "ignoring playout-ended outside streaming");
            return Ok(());
        }
        if state.replay_lock {
            debug!("replay lock set, re-presenting current stream");
            return self.sink.restart_playout().await;
        }
        self.advance_locked(&mut state).await
    }

    /// Current phase/mode/track view
    pub async fn snapshot(&self) -> ControllerSnapshot {
        let state = self.state.lock().await;
        ControllerSnapshot {
            phase: state.phase,
            mode: state.mode,
            replay_lock: state.replay_lock,
            current: state.session.current().cloned(),
        }
    }

    async fn play_query(self: &Arc<Self>, query: &str) -> Result<Reply> {
        let mut state = self.state.lock().await;

        let tracks = state.session.catalog().search_tracks(query).await?;
        // First result wins; no ranking beyond catalog order.
        let track = tracks
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmptyQuery(query.to_string()))?;
        info!(track = %track.id, query, "query resolved");

        state.mode = PlayMode::Fresh;
        state.replay_lock = false;
        let title = track.full_title();
        self.begin_loading(&mut state, Activation::Direct(track)).await;
        Ok(Reply::Downloading { title })
    }

    async fn play_wave(self: &Arc<Self>) -> Result<Reply> {
        let mut state = self.state.lock().await;
        state.mode = PlayMode::Fresh;
        self.advance_locked(&mut state).await?;
        Ok(Reply::PlayingWave)
    }

    async fn skip(self: &Arc<Self>) -> Result<Reply> {
        let mut state = self.state.lock().await;
        if state.phase == Phase::Idle {
            return Err(Error::NoActiveTrack);
        }
        self.advance_locked(&mut state).await?;
        Ok(Reply::Skipped)
    }

    async fn stop(self: &Arc<Self>) -> Result<Reply> {
        let mut state = self.state.lock().await;
        self.cancel_loading(&mut state).await;
        // Invalidate any result that slipped past the abort.
        state.generation += 1;
        if let Err(e) = self.sink.stop_playout().await {
            warn!(error = %e, "failed to stop playout");
        }
        state.phase = Phase::Idle;
        Ok(Reply::Stopped)
    }

    async fn pause(&self) -> Result<Reply> {
        let mut state = self.state.lock().await;
        match state.phase {
            Phase::Streaming => {
                self.sink.pause().await?;
                state.phase = Phase::Paused;
                Ok(Reply::Paused)
            }
            Phase::Loading => Err(Error::Busy),
            _ => Err(Error::NoActiveTrack),
        }
    }

    async fn resume(&self) -> Result<Reply> {
        let mut state = self.state.lock().await;
        match state.phase {
            Phase::Paused => {
                self.sink.resume().await?;
                state.phase = Phase::Streaming;
                Ok(Reply::Resumed)
            }
            Phase::Loading => Err(Error::Busy),
            _ => Err(Error::NoActiveTrack),
        }
    }

    async fn replay(&self) -> Result<Reply> {
        let mut state = self.state.lock().await;
        match state.phase {
            Phase::Streaming | Phase::Paused => {
                self.sink.restart_playout().await?;
                state.replay_lock = true;
                // Restarting from the top resumes a paused stream.
                state.phase = Phase::Streaming;
                Ok(Reply::OnReplay)
            }
            Phase::Loading => Err(Error::Busy),
            Phase::Idle => Err(Error::NoActiveTrack),
        }
    }

    async fn set_volume(&self, volume: u16) -> Result<Reply> {
        if !(MIN_VOLUME..=MAX_VOLUME).contains(&volume) {
            return Err(Error::InvalidVolume);
        }
        self.sink.set_volume(volume).await?;
        Ok(Reply::VolumeChanged { volume })
    }

    async fn now_playing(&self) -> Result<Reply> {
        let state = self.state.lock().await;
        let active = state.session.current().ok_or(Error::NoActiveTrack)?;
        Ok(Reply::NowPlaying {
            title: active.track.full_title(),
        })
    }

    /// The shared advance path for skip, bare play and sink-ended:
    /// stop playout, ask the session for the next track per mode, load it
    async fn advance_locked(self: &Arc<Self>, state: &mut ControllerState) -> Result<()> {
        self.cancel_loading(state).await;
        if matches!(state.phase, Phase::Streaming | Phase::Paused) {
            if let Err(e) = self.sink.stop_playout().await {
                warn!(error = %e, "failed to stop playout");
            }
        }

        let advanced = match state.mode {
            PlayMode::Fresh => state.session.start_radio().await,
            PlayMode::Queued => state.session.advance().await,
        };
        if let Err(e) = advanced {
            state.phase = Phase::Idle;
            return Err(e);
        }
        state.mode = PlayMode::Queued;

        self.begin_loading(state, Activation::Advanced).await;
        Ok(())
    }

    /// Start a prepare for the pending activation on a worker task
    ///
    /// The task owns only pipeline resources; applying its result happens
    /// back under the controller lock in [`finish_loading`](Self::finish_loading).
    async fn begin_loading(self: &Arc<Self>, state: &mut ControllerState, activation: Activation) {
        self.cancel_loading(state).await;
        state.generation += 1;
        let generation = state.generation;

        let track = match &activation {
            Activation::Direct(track) => track.clone(),
            Activation::Advanced => match state.session.current() {
                Some(active) => active.track.clone(),
                None => {
                    // advance/start_radio always leaves a current track
                    // behind; reaching this means a session bug.
                    warn!("no active track after advance, staying idle");
                    state.phase = Phase::Idle;
                    return;
                }
            },
        };

        state.phase = Phase::Loading;
        let controller = Arc::clone(self);
        let pipeline = Arc::clone(&self.pipeline);
        let handle = tokio::spawn(async move {
            let result = pipeline.prepare(&track).await;
            controller.finish_loading(generation, activation, result).await;
        });
        state.loading = Some(LoadingJob { generation, handle });
    }

    /// Apply a prepare result on the serialized path, or discard it if a
    /// newer transition has superseded it
    async fn finish_loading(
        self: &Arc<Self>,
        generation: u64,
        activation: Activation,
        result: Result<StreamHandle>,
    ) {
        let mut state = self.state.lock().await;
        if generation != state.generation {
            debug!(
                generation,
                current = state.generation,
                "discarding stale prepare result"
            );
            return;
        }
        state.loading = None;

        let handle = match result {
            Ok(handle) => handle,
            Err(e) => {
                // The track stays selected for now_playing; the operator
                // retries with skip or play.
                warn!(error = %e, "prepare failed, not streaming");
                state.phase = Phase::Idle;
                return;
            }
        };

        if let Activation::Direct(track) = activation {
            if let Err(e) = state.session.activate_direct(track).await {
                warn!(error = %e, "activation failed after prepare");
                state.phase = Phase::Idle;
                return;
            }
        }

        if let Err(e) = self.attach_sink(&handle).await {
            warn!(error = %e, "failed to hand stream to sink");
            state.phase = Phase::Idle;
            return;
        }

        state.phase = Phase::Streaming;
        info!(track = %handle.track_id, "streaming");
    }

    async fn attach_sink(&self, handle: &StreamHandle) -> Result<()> {
        self.sink.set_input(&handle.path).await?;
        if !self.sink.is_connected() {
            self.sink.start().await?;
        }
        Ok(())
    }

    /// Abort the in-flight prepare, if any, and wait for the task to be
    /// dropped so the pipeline's single-flight lock and staging file are
    /// released before the next prepare starts
    async fn cancel_loading(&self, state: &mut ControllerState) {
        if let Some(job) = state.loading.take() {
            debug!(generation = job.generation, "cancelling in-flight prepare");
            job.handle.abort();
            let _ = job.handle.await;
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController").finish_non_exhaustive()
    }
}
