//! Capability interface for the remote music catalog
//!
//! The session controller depends on this trait rather than on a concrete
//! HTTP client, so the catalog can be substituted with a test double. The
//! `voxcatalog` crate provides the production implementation.

use crate::error::Result;
use crate::model::{Batch, DownloadCandidate, Station, Track};
use async_trait::async_trait;

/// Remote catalog operations consumed by the core
///
/// Implementations do not retry internally; a failed call surfaces as
/// [`Error::CatalogUnavailable`](crate::Error::CatalogUnavailable) and the
/// caller decides whether to retry.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Resolve a free-text query to tracks, in catalog ranking order
    async fn search_tracks(&self, query: &str) -> Result<Vec<Track>>;

    /// Fetch full metadata for a track by id
    async fn track(&self, track_id: &str) -> Result<Track>;

    /// List download candidates for a track
    async fn download_candidates(&self, track_id: &str) -> Result<Vec<DownloadCandidate>>;

    /// Turn a download candidate into a direct download URL
    async fn resolve_download_url(&self, candidate: &DownloadCandidate) -> Result<String>;

    /// Fetch a batch of queued tracks for a station
    ///
    /// `seed_track_id` carries the just-finished track so the catalog can
    /// avoid immediate repeats in continuation batches.
    async fn station_batch(&self, station: &Station, seed_track_id: Option<&str>)
    -> Result<Batch>;

    /// Report that playback of a track started (catalog-side telemetry)
    async fn send_play_started(&self, track: &Track, play_id: &str) -> Result<()>;

    /// Report that playback of a track finished (catalog-side telemetry)
    async fn send_play_finished(&self, track: &Track, play_id: &str) -> Result<()>;

    /// Report that a radio batch started
    async fn send_radio_started(&self, station: &Station, batch_id: &str) -> Result<()>;

    /// Report that a batch track started (radio-side feedback)
    async fn send_track_started(&self, station: &Station, track: &Track, batch_id: &str)
    -> Result<()>;

    /// Report that a batch track finished (radio-side feedback)
    async fn send_track_finished(&self, station: &Station, track: &Track, batch_id: &str)
    -> Result<()>;
}
