//! VoxWave playback core
//!
//! The radio/playback session controller of the VoxWave relay:
//!
//! - **[`RadioSession`]**: station/batch/cursor state and the catalog
//!   feedback protocol, with its strict finished-before-started ordering
//! - **[`PlaybackPipeline`]**: single-flight fetch → transcode → publish of
//!   one track into the fixed PCM format the sink reads
//! - **[`SessionController`]**: the state machine binding operator commands
//!   and sink playout-ended events to the two above
//!
//! The messaging transport, the voice-call transport and the catalog's HTTP
//! API live behind the [`CatalogClient`] and [`AudioSink`] capability
//! traits so they can be swapped for test doubles.

pub mod catalog;
pub mod command;
pub mod controller;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod session;
pub mod sink;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::CatalogClient;
pub use command::{Command, Reply};
pub use controller::{ControllerSnapshot, Phase, SessionController};
pub use error::{Error, Result};
pub use model::{
    Batch, DownloadCandidate, PlayMode, Station, StreamFormat, StreamHandle, Track, TrackRef,
};
pub use pipeline::{AudioFetcher, FfmpegTranscoder, HttpFetcher, PlaybackPipeline, Transcoder};
pub use session::{ActiveTrack, RadioSession};
pub use sink::{AudioSink, MAX_VOLUME, MIN_VOLUME, SinkEvent};
