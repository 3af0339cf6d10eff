//! Test doubles shared by the core's unit tests

use crate::catalog::CatalogClient;
use crate::error::{Error, Result};
use crate::model::{Batch, DownloadCandidate, Station, Track, TrackRef};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Station used across tests
pub fn test_station() -> Station {
    Station {
        kind: "user".to_string(),
        tag: "onyourwave".to_string(),
        from_context: "test-context".to_string(),
    }
}

/// Catalog double that records every call in order
///
/// Batches can be scripted with [`push_batch`](Self::push_batch); once the
/// script runs out, batches of three synthetic tracks are generated so long
/// advance sequences keep working.
#[derive(Default)]
pub struct RecordingCatalog {
    calls: Mutex<Vec<String>>,
    batches: Mutex<VecDeque<Batch>>,
    search_results: Mutex<HashMap<String, Vec<Track>>>,
    candidates: Mutex<HashMap<String, Vec<DownloadCandidate>>>,
    batch_counter: AtomicUsize,
    fail_batches: AtomicBool,
}

impl RecordingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next batch returned by `station_batch`
    pub fn push_batch(&self, track_ids: &[&str]) {
        let n = self.batch_counter.fetch_add(1, Ordering::SeqCst);
        let batch = Batch {
            batch_id: format!("batch-{n}"),
            tracks: track_ids
                .iter()
                .map(|id| TrackRef {
                    track_id: (*id).to_string(),
                })
                .collect(),
        };
        self.batches.lock().unwrap().push_back(batch);
    }

    /// Script the result of a search query
    pub fn set_search(&self, query: &str, track_ids: &[&str]) {
        let tracks = track_ids.iter().map(|id| Self::make_track(id)).collect();
        self.search_results
            .lock()
            .unwrap()
            .insert(query.to_string(), tracks);
    }

    /// Script the download candidates for a track
    pub fn set_candidates(&self, track_id: &str, candidates: Vec<DownloadCandidate>) {
        self.candidates
            .lock()
            .unwrap()
            .insert(track_id.to_string(), candidates);
    }

    /// Make every subsequent batch fetch fail
    pub fn fail_batches(&self) {
        self.fail_batches.store(true, Ordering::SeqCst);
    }

    /// Snapshot of recorded calls, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Index of the first recorded call starting with `prefix`
    pub fn first_call_index(&self, prefix: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.starts_with(prefix))
    }

    pub fn make_track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Title {id}"),
            artists: vec!["Artist".to_string()],
            album_id: Some("album-1".to_string()),
            duration_ms: 120_000,
            candidates: vec![],
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CatalogClient for RecordingCatalog {
    async fn search_tracks(&self, query: &str) -> Result<Vec<Track>> {
        self.record(format!("search:{query}"));
        Ok(self
            .search_results
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn track(&self, track_id: &str) -> Result<Track> {
        self.record(format!("track:{track_id}"));
        Ok(Self::make_track(track_id))
    }

    async fn download_candidates(&self, track_id: &str) -> Result<Vec<DownloadCandidate>> {
        self.record(format!("candidates:{track_id}"));
        Ok(self
            .candidates
            .lock()
            .unwrap()
            .get(track_id)
            .cloned()
            .unwrap_or_else(|| {
                vec![DownloadCandidate {
                    codec: "mp3".to_string(),
                    bitrate_kbps: 192,
                    url: format!("http://catalog.test/dl/{track_id}"),
                }]
            }))
    }

    async fn resolve_download_url(&self, candidate: &DownloadCandidate) -> Result<String> {
        self.record(format!("resolve:{}", candidate.url));
        Ok(candidate.url.clone())
    }

    async fn station_batch(
        &self,
        _station: &Station,
        seed_track_id: Option<&str>,
    ) -> Result<Batch> {
        self.record(format!("batch:{}", seed_track_id.unwrap_or("-")));
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(Error::catalog("scripted batch failure"));
        }
        if let Some(batch) = self.batches.lock().unwrap().pop_front() {
            return Ok(batch);
        }
        let n = self.batch_counter.fetch_add(1, Ordering::SeqCst);
        Ok(Batch {
            batch_id: format!("batch-{n}"),
            tracks: (0..3)
                .map(|i| TrackRef {
                    track_id: format!("auto-{n}-{i}"),
                })
                .collect(),
        })
    }

    async fn send_play_started(&self, track: &Track, play_id: &str) -> Result<()> {
        self.record(format!("play_started:{}:{}", track.id, play_id));
        Ok(())
    }

    async fn send_play_finished(&self, track: &Track, play_id: &str) -> Result<()> {
        self.record(format!("play_finished:{}:{}", track.id, play_id));
        Ok(())
    }

    async fn send_radio_started(&self, _station: &Station, batch_id: &str) -> Result<()> {
        self.record(format!("radio_started:{batch_id}"));
        Ok(())
    }

    async fn send_track_started(
        &self,
        _station: &Station,
        track: &Track,
        batch_id: &str,
    ) -> Result<()> {
        self.record(format!("track_started:{}:{}", track.id, batch_id));
        Ok(())
    }

    async fn send_track_finished(
        &self,
        _station: &Station,
        track: &Track,
        batch_id: &str,
    ) -> Result<()> {
        self.record(format!("track_finished:{}:{}", track.id, batch_id));
        Ok(())
    }
}
