//! High-level catalog client implementing the core capability trait

use crate::api::CatalogApi;
use crate::api::auth::AuthInfo;
use crate::error::{CatalogError, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};
use voxcore::{Batch, CatalogClient, DownloadCandidate, Station, Track, TrackRef};

/// Authenticated catalog client
///
/// Construction performs authentication (token first, credentials as
/// fallback); after that the client is immutable and shared behind an
/// `Arc` by the session layer.
pub struct RemoteCatalog {
    api: CatalogApi,
    auth: AuthInfo,
}

impl RemoteCatalog {
    /// Connect and authenticate against the default API host
    pub async fn connect(
        token: Option<&str>,
        credentials: Option<(&str, &str)>,
    ) -> Result<Self> {
        let api = CatalogApi::new()?;
        Self::connect_with(api, token, credentials).await
    }

    /// Connect and authenticate on an already-built low-level client
    ///
    /// A stored token is tried first; when the API rejects it and
    /// credentials are available, a fresh token is requested. Captcha
    /// demands abort immediately since they need the operator.
    pub async fn connect_with(
        mut api: CatalogApi,
        token: Option<&str>,
        credentials: Option<(&str, &str)>,
    ) -> Result<Self> {
        if let Some(token) = token {
            match api.login_with_token(token).await {
                Ok(auth) => return Ok(Self { api, auth }),
                Err(e @ CatalogError::CaptchaRequired(_)) => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Stored token rejected, falling back to credentials")
                }
            }
        }

        let (username, password) = credentials.ok_or(CatalogError::NotAuthenticated)?;
        let auth = api.login_with_credentials(username, password).await?;
        Ok(Self { api, auth })
    }

    /// Token in effect, for persistence across restarts
    pub fn token(&self) -> &str {
        &self.auth.token
    }

    /// Authenticated account id
    pub fn uid(&self) -> &str {
        &self.auth.uid
    }

    /// Resolve a `kind:tag` station spec to a core station
    ///
    /// The `from` context comes from the station-info endpoint; when the
    /// API omits it, a `kind-tag` fallback keeps telemetry well-formed.
    pub async fn resolve_station(&self, spec: &str) -> Result<Station> {
        let (kind, tag) = spec
            .split_once(':')
            .ok_or_else(|| CatalogError::UnexpectedResponse(format!("bad station spec: {spec}")))?;

        let infos = self.api.station_info(spec).await?;
        let from_context = infos
            .into_iter()
            .next()
            .map(|i| i.station.id_for_from)
            .unwrap_or_else(|| format!("{kind}-{tag}"));
        debug!(station = spec, from = %from_context, "Station resolved");

        Ok(Station {
            kind: kind.to_string(),
            tag: tag.to_string(),
            from_context,
        })
    }

    /// Access the low-level API layer
    pub fn api(&self) -> &CatalogApi {
        &self.api
    }
}

#[async_trait]
impl CatalogClient for RemoteCatalog {
    async fn search_tracks(&self, query: &str) -> voxcore::Result<Vec<Track>> {
        let results = self.api.search_tracks(query).await?;
        Ok(results.into_iter().map(Track::from).collect())
    }

    async fn track(&self, track_id: &str) -> voxcore::Result<Track> {
        let wire = self.api.track(track_id).await?;
        Ok(wire.into())
    }

    async fn download_candidates(&self, track_id: &str) -> voxcore::Result<Vec<DownloadCandidate>> {
        let infos = self.api.download_info(track_id).await?;
        Ok(infos.into_iter().map(DownloadCandidate::from).collect())
    }

    async fn resolve_download_url(&self, candidate: &DownloadCandidate) -> voxcore::Result<String> {
        Ok(self.api.direct_link(&candidate.url).await?)
    }

    async fn station_batch(
        &self,
        station: &Station,
        seed_track_id: Option<&str>,
    ) -> voxcore::Result<Batch> {
        let wire = self
            .api
            .station_tracks(&station.id(), seed_track_id)
            .await?;
        info!(
            station = %station.id(),
            batch = %wire.batch_id,
            tracks = wire.sequence.len(),
            "Fetched station batch"
        );
        Ok(Batch {
            batch_id: wire.batch_id,
            tracks: wire
                .sequence
                .into_iter()
                .map(|item| TrackRef {
                    track_id: item.track.id,
                })
                .collect(),
        })
    }

    async fn send_play_started(&self, track: &Track, play_id: &str) -> voxcore::Result<()> {
        let total = track.duration_seconds();
        self.api
            .play_audio(
                &track.id,
                track.album_id.as_deref(),
                play_id,
                "radio",
                total,
                0.0,
                0.0,
            )
            .await?;
        Ok(())
    }

    async fn send_play_finished(&self, track: &Track, play_id: &str) -> voxcore::Result<()> {
        let total = track.duration_seconds();
        self.api
            .play_audio(
                &track.id,
                track.album_id.as_deref(),
                play_id,
                "radio",
                total,
                total,
                total,
            )
            .await?;
        Ok(())
    }

    async fn send_radio_started(&self, station: &Station, batch_id: &str) -> voxcore::Result<()> {
        self.api
            .feedback_radio_started(&station.id(), &station.from_context, batch_id)
            .await?;
        Ok(())
    }

    async fn send_track_started(
        &self,
        station: &Station,
        track: &Track,
        batch_id: &str,
    ) -> voxcore::Result<()> {
        self.api
            .feedback_track_started(&station.id(), batch_id, &track.id)
            .await?;
        Ok(())
    }

    async fn send_track_finished(
        &self,
        station: &Station,
        track: &Track,
        batch_id: &str,
    ) -> voxcore::Result<()> {
        self.api
            .feedback_track_finished(&station.id(), batch_id, &track.id, track.duration_seconds())
            .await?;
        Ok(())
    }
}
