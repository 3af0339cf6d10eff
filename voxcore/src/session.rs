//! Radio session state and the catalog feedback protocol
//!
//! `RadioSession` owns the station identity, the current batch of queued
//! tracks, the sequence cursor and the active track. It is the only place
//! that talks the catalog's feedback protocol, and it guarantees the
//! ordering the recommendation model relies on: feedback for "track N
//! finished" is sent before feedback for "track N+1 started".

use crate::catalog::CatalogClient;
use crate::error::{Error, Result};
use crate::model::{Batch, Station, Track};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The currently playing track together with its activation token
#[derive(Debug, Clone)]
pub struct ActiveTrack {
    /// Full track metadata
    pub track: Track,
    /// Per-activation correlation token reported to the catalog
    pub play_id: String,
}

/// Station/batch/cursor state plus the feedback-ordering protocol
pub struct RadioSession {
    catalog: Arc<dyn CatalogClient>,
    station: Station,
    batch: Option<Batch>,
    cursor: usize,
    current: Option<ActiveTrack>,
}

impl RadioSession {
    /// Create a session for a station
    pub fn new(catalog: Arc<dyn CatalogClient>, station: Station) -> Self {
        Self {
            catalog,
            station,
            batch: None,
            cursor: 0,
            current: None,
        }
    }

    /// The session's station
    pub fn station(&self) -> &Station {
        &self.station
    }

    /// The catalog the session talks to
    pub fn catalog(&self) -> &Arc<dyn CatalogClient> {
        &self.catalog
    }

    /// The currently active track, if any
    pub fn current(&self) -> Option<&ActiveTrack> {
        self.current.as_ref()
    }

    /// The current batch id, if a batch is loaded
    pub fn batch_id(&self) -> Option<&str> {
        self.batch.as_ref().map(|b| b.batch_id.as_str())
    }

    /// Start the radio with a fresh batch and activate its first track
    pub async fn start_radio(&mut self) -> Result<Track> {
        info!(station = %self.station.id(), "starting radio");
        self.refresh_batch(None).await?;
        self.activate_at_cursor().await
    }

    /// Finish the active track and activate the next one in the batch
    ///
    /// Sends the catalog play-finish and radio track-finish feedback (in
    /// that order) for the active track before anything is sent for its
    /// successor. When the batch is exhausted a continuation batch seeded
    /// with the finished track id replaces it.
    pub async fn advance(&mut self) -> Result<Track> {
        let finished = self.current.clone().ok_or(Error::NoActiveTrack)?;
        let (batch_id, batch_len) = match &self.batch {
            Some(batch) => (batch.batch_id.clone(), batch.len()),
            None => return Err(Error::NoActiveTrack),
        };

        self.send_finish_feedback(&finished, &batch_id).await;

        if self.cursor + 1 >= batch_len {
            self.refresh_batch(Some(finished.track.id.clone())).await?;
        } else {
            self.cursor += 1;
        }

        self.activate_at_cursor().await
    }

    /// Activate an explicitly selected track, outside any batch
    ///
    /// Used by the query path: generates a fresh play id, fetches full
    /// metadata and reports play-start to the catalog. The stale batch is
    /// dropped, so no radio-side feedback is sent; the next auto-advance
    /// restarts the radio with a fresh batch.
    pub async fn activate_direct(&mut self, track: Track) -> Result<Track> {
        let play_id = generate_play_id();
        let track = self.catalog.track(&track.id).await?;

        if let Err(e) = self.catalog.send_play_started(&track, &play_id).await {
            warn!(track = %track.id, error = %e, "play-started feedback failed");
        }

        self.batch = None;
        self.cursor = 0;
        self.current = Some(ActiveTrack {
            track: track.clone(),
            play_id,
        });

        Ok(track)
    }

    /// Replace the batch (cursor reset to 0) and report radio-started
    async fn refresh_batch(&mut self, seed_track_id: Option<String>) -> Result<()> {
        let batch = self
            .catalog
            .station_batch(&self.station, seed_track_id.as_deref())
            .await?;

        if batch.is_empty() {
            return Err(Error::EmptyBatch(self.station.id()));
        }

        if let Err(e) = self
            .catalog
            .send_radio_started(&self.station, &batch.batch_id)
            .await
        {
            warn!(batch = %batch.batch_id, error = %e, "radio-started feedback failed");
        }

        debug!(batch = %batch.batch_id, tracks = batch.len(), "batch replaced");
        self.batch = Some(batch);
        self.cursor = 0;
        Ok(())
    }

    /// Activate the track under the cursor: new play id, metadata fetch,
    /// play-started (catalog) then track-started (radio) feedback
    async fn activate_at_cursor(&mut self) -> Result<Track> {
        let (track_id, batch_id) = {
            let batch = self.batch.as_ref().ok_or(Error::NoActiveTrack)?;
            let track_ref = batch.tracks.get(self.cursor).ok_or(Error::NoActiveTrack)?;
            (track_ref.track_id.clone(), batch.batch_id.clone())
        };

        let play_id = generate_play_id();
        let track = self.catalog.track(&track_id).await?;

        if let Err(e) = self.catalog.send_play_started(&track, &play_id).await {
            warn!(track = %track.id, error = %e, "play-started feedback failed");
        }
        if let Err(e) = self
            .catalog
            .send_track_started(&self.station, &track, &batch_id)
            .await
        {
            warn!(track = %track.id, error = %e, "track-started feedback failed");
        }

        debug!(track = %track.id, play_id = %play_id, cursor = self.cursor, "track activated");
        self.current = Some(ActiveTrack {
            track: track.clone(),
            play_id,
        });

        Ok(track)
    }

    /// Finish feedback for a track: catalog play-finish first, then radio
    /// track-finish. Failures degrade recommendations only, so they are
    /// logged and not escalated.
    async fn send_finish_feedback(&self, finished: &ActiveTrack, batch_id: &str) {
        if let Err(e) = self
            .catalog
            .send_play_finished(&finished.track, &finished.play_id)
            .await
        {
            warn!(track = %finished.track.id, error = %e, "play-finished feedback failed");
        }
        if let Err(e) = self
            .catalog
            .send_track_finished(&self.station, &finished.track, batch_id)
            .await
        {
            warn!(track = %finished.track.id, error = %e, "track-finished feedback failed");
        }
    }
}

/// Generate a per-activation play id in the catalog's expected
/// `nnn-nnn-nnn` shape
fn generate_play_id() -> String {
    let mut rng = rand::rng();
    format!(
        "{}-{}-{}",
        rng.random_range(1..1000),
        rng.random_range(1..1000),
        rng.random_range(1..1000)
    )
}
