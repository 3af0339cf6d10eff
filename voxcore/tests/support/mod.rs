//! Doubles for exercising the controller end-to-end

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use voxcore::pipeline::{AudioFetcher, Transcoder};
use voxcore::{
    AudioSink, Batch, CatalogClient, DownloadCandidate, Error, Phase, Result, SessionController,
    Station, StreamFormat, Track, TrackRef,
};

pub fn test_station() -> Station {
    Station {
        kind: "user".to_string(),
        tag: "onyourwave".to_string(),
        from_context: "test-context".to_string(),
    }
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

/// Catalog double recording every call in order
#[derive(Default)]
pub struct RecordingCatalog {
    calls: Mutex<Vec<String>>,
    batches: Mutex<VecDeque<Batch>>,
    search_results: Mutex<HashMap<String, Vec<Track>>>,
    batch_counter: AtomicUsize,
}

impl RecordingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

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

    pub fn set_search(&self, query: &str, track_ids: &[&str]) {
        let tracks = track_ids.iter().map(|id| make_track(id)).collect();
        self.search_results
            .lock()
            .unwrap()
            .insert(query.to_string(), tracks);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
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
        Ok(make_track(track_id))
    }

    async fn download_candidates(&self, track_id: &str) -> Result<Vec<DownloadCandidate>> {
        self.record(format!("candidates:{track_id}"));
        Ok(vec![DownloadCandidate {
            codec: "mp3".to_string(),
            bitrate_kbps: 192,
            url: format!("http://catalog.test/dl/{track_id}"),
        }])
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

/// Sink double recording operations in order
#[derive(Default)]
pub struct RecordingSink {
    connected: AtomicBool,
    ops: Mutex<Vec<String>>,
    volumes: Mutex<Vec<u16>>,
    inputs: Mutex<Vec<PathBuf>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    pub fn op_count(&self, name: &str) -> usize {
        self.ops().iter().filter(|o| o.as_str() == name).count()
    }

    pub fn volumes(&self) -> Vec<u16> {
        self.volumes.lock().unwrap().clone()
    }

    pub fn inputs(&self) -> Vec<PathBuf> {
        self.inputs.lock().unwrap().clone()
    }

    fn record(&self, op: &str) {
        self.ops.lock().unwrap().push(op.to_string());
    }
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn start(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        self.record("start");
        Ok(())
    }

    async fn stop_playout(&self) -> Result<()> {
        self.record("stop_playout");
        Ok(())
    }

    async fn restart_playout(&self) -> Result<()> {
        self.record("restart_playout");
        Ok(())
    }

    async fn set_input(&self, path: &Path) -> Result<()> {
        self.inputs.lock().unwrap().push(path.to_path_buf());
        self.record("set_input");
        Ok(())
    }

    async fn set_volume(&self, percent: u16) -> Result<()> {
        self.volumes.lock().unwrap().push(percent);
        self.record("set_volume");
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.record("pause");
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.record("resume");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn leave(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.record("leave");
        Ok(())
    }

    async fn rejoin(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        self.record("rejoin");
        Ok(())
    }
}

/// Fetcher double; when gated, fetches block until a permit is granted
pub struct GatedFetcher {
    gate: Notify,
    gated: AtomicBool,
    completed: Mutex<Vec<String>>,
}

impl GatedFetcher {
    pub fn open() -> Self {
        Self {
            gate: Notify::new(),
            gated: AtomicBool::new(false),
            completed: Mutex::new(Vec::new()),
        }
    }

    pub fn closed() -> Self {
        Self {
            gate: Notify::new(),
            gated: AtomicBool::new(true),
            completed: Mutex::new(Vec::new()),
        }
    }

    /// Grant one blocked (or future) fetch
    pub fn release_one(&self) {
        self.gate.notify_one();
    }

    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioFetcher for GatedFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        if self.gated.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        tokio::fs::write(dest, b"mp3-bytes")
            .await
            .map_err(|e| Error::DownloadFailed(e.to_string()))?;
        self.completed.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Transcoder double copying staging bytes to the output path
pub struct CopyTranscoder;

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(&self, input: &Path, output: &Path, _format: StreamFormat) -> Result<()> {
        tokio::fs::copy(input, output)
            .await
            .map_err(|e| Error::TranscodeFailed(e.to_string()))?;
        Ok(())
    }
}

/// Poll the controller until it reaches `phase` or the deadline passes
pub async fn wait_for_phase(controller: &Arc<SessionController>, phase: Phase) {
    for _ in 0..300 {
        if controller.snapshot().await.phase == phase {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "controller never reached {phase:?}, stuck in {:?}",
        controller.snapshot().await.phase
    );
}
