//! Domain models for the playback session
//!
//! These are the catalog-agnostic types the core operates on. The concrete
//! catalog crate converts its wire models into these before they enter the
//! session.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A recommendation context on the remote catalog (e.g. a personal wave)
///
/// Immutable once a session starts; re-derived only by re-authenticating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Station {
    /// Station type (e.g. "user")
    pub kind: String,
    /// Station tag (e.g. "onyourwave")
    pub tag: String,
    /// Opaque context string required by the catalog's feedback protocol
    pub from_context: String,
}

impl Station {
    /// The `type:tag` identifier the catalog addresses stations by
    pub fn id(&self) -> String {
        format!("{}:{}", self.kind, self.tag)
    }
}

/// A resolved track
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// Catalog identifier
    pub id: String,
    /// Track title
    pub title: String,
    /// Artist names, in catalog order
    pub artists: Vec<String>,
    /// First album id, required by the catalog's play telemetry
    #[serde(default)]
    pub album_id: Option<String>,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Download candidates, when already resolved
    #[serde(default)]
    pub candidates: Vec<DownloadCandidate>,
}

impl Track {
    /// Duration in seconds, as the catalog's telemetry expects it
    pub fn duration_seconds(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    /// "Artists - Title" display form
    pub fn full_title(&self) -> String {
        format!("{} - {}", self.artists.join(", "), self.title)
    }
}

/// One downloadable rendition of a track
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadCandidate {
    /// Codec name as reported by the catalog (e.g. "mp3", "aac")
    pub codec: String,
    /// Bitrate in kbit/s
    pub bitrate_kbps: u32,
    /// Resolver URL; the catalog turns this into a direct download link
    pub url: String,
}

/// Reference to a track inside a station batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackRef {
    /// Catalog identifier of the referenced track
    pub track_id: String,
}

/// One page of queued track references returned by the catalog for a station
///
/// Consumed strictly in order and replaced wholesale when exhausted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Batch {
    /// Opaque batch identifier used in radio feedback calls
    pub batch_id: String,
    /// Queued track references
    pub tracks: Vec<TrackRef>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// How the next auto-advance picks a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    /// Continue the current batch (RadioSession::advance)
    Queued,
    /// Restart the radio with a fresh batch (RadioSession::start_radio)
    Fresh,
}

/// Fixed PCM stream format consumed by the audio sink
///
/// Samples are always signed 16-bit little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
}

impl Default for StreamFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

impl StreamFormat {
    /// Bytes of PCM per second of audio (2 bytes per sample)
    pub fn bytes_per_second(&self) -> u64 {
        self.sample_rate as u64 * self.channels as u64 * 2
    }
}

/// A prepared PCM stream ready to be handed to the sink
#[derive(Debug, Clone)]
pub struct StreamHandle {
    /// Path of the PCM file the sink reads from
    pub path: PathBuf,
    /// Format of the stream
    pub format: StreamFormat,
    /// Track the stream was prepared for
    pub track_id: String,
}
