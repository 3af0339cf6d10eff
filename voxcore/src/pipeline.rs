//! Fetch → transcode → publish pipeline for a single track
//!
//! `PlaybackPipeline` turns a resolved track into a fixed-format PCM file
//! the sink reads from. At most one prepare runs per session (both writers
//! target the same output path), staging files are uniquely named and
//! removed on every exit path, and both the download and the transcode run
//! under a bounded timeout.

use crate::catalog::CatalogClient;
use crate::error::{Error, Result};
use crate::model::{DownloadCandidate, StreamFormat, StreamHandle, Track};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default bound on the source download
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
/// Default bound on the external transcode
pub const DEFAULT_TRANSCODE_TIMEOUT: Duration = Duration::from_secs(120);

/// Fetches a source URL into a local staging file
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Invokes the external transcoder to produce the sink's PCM format
///
/// Implementations must stop the external process when the returned future
/// is dropped; a later prepare writes the same output path.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, input: &Path, output: &Path, format: StreamFormat) -> Result<()>;
}

/// Single-flight fetch/transcode pipeline bound to one output path
pub struct PlaybackPipeline {
    catalog: Arc<dyn CatalogClient>,
    fetcher: Arc<dyn AudioFetcher>,
    transcoder: Arc<dyn Transcoder>,
    staging_dir: PathBuf,
    output_path: PathBuf,
    format: StreamFormat,
    download_timeout: Duration,
    transcode_timeout: Duration,
    in_flight: Arc<Mutex<()>>,
}

impl PlaybackPipeline {
    /// Create a pipeline writing PCM to `output_path`, staging under
    /// `staging_dir`
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        fetcher: Arc<dyn AudioFetcher>,
        transcoder: Arc<dyn Transcoder>,
        staging_dir: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            transcoder,
            staging_dir: staging_dir.into(),
            output_path: output_path.into(),
            format: StreamFormat::default(),
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            transcode_timeout: DEFAULT_TRANSCODE_TIMEOUT,
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    /// Override the download/transcode timeouts
    pub fn with_timeouts(mut self, download: Duration, transcode: Duration) -> Self {
        self.download_timeout = download;
        self.transcode_timeout = transcode;
        self
    }

    /// The output path the sink reads from
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Prepare a track end-to-end: pick a candidate, download it to a
    /// staging file, transcode to the fixed PCM format
    ///
    /// Rejects with [`Error::PipelineBusy`] when another prepare is in
    /// flight. The staging file is removed whether the prepare succeeds,
    /// fails or is cancelled.
    pub async fn prepare(&self, track: &Track) -> Result<StreamHandle> {
        let _guard = self
            .in_flight
            .clone()
            .try_lock_owned()
            .map_err(|_| Error::PipelineBusy)?;

        let candidates = if track.candidates.is_empty() {
            self.catalog.download_candidates(&track.id).await?
        } else {
            track.candidates.clone()
        };
        let candidate =
            select_candidate(&candidates).ok_or_else(|| Error::NoPlayableSource(track.id.clone()))?;
        debug!(track = %track.id, bitrate = candidate.bitrate_kbps, "candidate selected");

        let url = self.catalog.resolve_download_url(candidate).await?;

        let staging = StagingFile::new(self.staging_dir.join(format!("{}.mp3", Uuid::new_v4())));

        timeout(self.download_timeout, self.fetcher.fetch(&url, staging.path()))
            .await
            .map_err(|_| {
                Error::DownloadFailed(format!(
                    "download exceeded {}s",
                    self.download_timeout.as_secs()
                ))
            })??;

        timeout(
            self.transcode_timeout,
            self.transcoder
                .transcode(staging.path(), &self.output_path, self.format),
        )
        .await
        .map_err(|_| {
            Error::TranscodeFailed(format!(
                "transcode exceeded {}s",
                self.transcode_timeout.as_secs()
            ))
        })??;

        debug!(track = %track.id, output = %self.output_path.display(), "stream prepared");
        Ok(StreamHandle {
            path: self.output_path.clone(),
            format: self.format,
            track_id: track.id.clone(),
        })
    }
}

/// Candidate policy: among mp3 renditions, the highest bitrate wins.
/// No fallback codec is attempted.
pub fn select_candidate(candidates: &[DownloadCandidate]) -> Option<&DownloadCandidate> {
    candidates
        .iter()
        .filter(|c| c.codec == "mp3")
        .max_by_key(|c| c.bitrate_kbps)
}

/// Scoped staging file: removed on drop, best-effort
struct StagingFile {
    path: PathBuf,
}

impl StagingFile {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "failed to remove staging file");
            }
        }
    }
}

/// Production fetcher streaming the source over HTTP
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("VoxWave/0.1")
            .build()
            .map_err(|e| Error::DownloadFailed(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AudioFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::DownloadFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::DownloadFailed(format!(
                "HTTP {} fetching source",
                response.status()
            )));
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| Error::DownloadFailed(e.to_string()))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::DownloadFailed(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::DownloadFailed(e.to_string()))?;
        }
        file.flush()
            .await
            .map_err(|e| Error::DownloadFailed(e.to_string()))?;
        Ok(())
    }
}

/// Production transcoder shelling out to ffmpeg
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    /// Use a specific ffmpeg binary
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output: &Path, format: StreamFormat) -> Result<()> {
        let result = tokio::process::Command::new(&self.binary)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-f")
            .arg("s16le")
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg("-ac")
            .arg(format.channels.to_string())
            .arg("-ar")
            .arg(format.sample_rate.to_string())
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            // A cancelled prepare must not leave ffmpeg writing the
            // shared output path.
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::TranscodeFailed(format!("failed to spawn ffmpeg: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: String = stderr.lines().rev().take(3).collect::<Vec<_>>().join(" | ");
            return Err(Error::TranscodeFailed(format!(
                "ffmpeg exited with {}: {tail}",
                result.status
            )));
        }

        let metadata = tokio::fs::metadata(output)
            .await
            .map_err(|e| Error::TranscodeFailed(e.to_string()))?;
        if metadata.len() == 0 {
            return Err(Error::TranscodeFailed(
                "ffmpeg produced no output".to_string(),
            ));
        }
        Ok(())
    }
}
