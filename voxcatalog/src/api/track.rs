//! Track endpoints: search, metadata, download candidates, direct links

use super::CatalogApi;
use crate::error::{CatalogError, Result};
use crate::models::{DownloadInfoWire, DownloadLinkWire, SearchWire, TrackWire};
use md5::{Digest, Md5};
use tracing::debug;

/// Salt mixed into the storage-link signature
const SIGN_SALT: &str = "XGRlBW9FXlekgbPrRHuSiA";

impl CatalogApi {
    /// Search tracks by free text, in catalog ranking order
    pub async fn search_tracks(&self, query: &str) -> Result<Vec<TrackWire>> {
        let params = [("text", query), ("type", "track"), ("page", "0")];
        let search: SearchWire = self.get("/search", &params).await?;
        Ok(search.tracks.map(|t| t.results).unwrap_or_default())
    }

    /// Fetch full metadata for one track
    pub async fn track(&self, track_id: &str) -> Result<TrackWire> {
        let tracks: Vec<TrackWire> = self.get(&format!("/tracks/{track_id}"), &[]).await?;
        tracks
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(format!("track {track_id}")))
    }

    /// List download options for a track
    pub async fn download_info(&self, track_id: &str) -> Result<Vec<DownloadInfoWire>> {
        self.get(&format!("/tracks/{track_id}/download-info"), &[])
            .await
    }

    /// Resolve a download-info URL into a signed direct link
    ///
    /// The storage endpoint returns host/path/ts plus a secret; the final
    /// URL carries an md5 over salt + path + secret.
    pub async fn direct_link(&self, download_info_url: &str) -> Result<String> {
        let separator = if download_info_url.contains('?') { '&' } else { '?' };
        let url = format!("{download_info_url}{separator}format=json");

        let body = self.get_raw(&url).await?;
        let link: DownloadLinkWire = serde_json::from_str(&body)?;

        let direct = build_direct_link(&link);
        debug!("Resolved direct link on host {}", link.host);
        Ok(direct)
    }
}

fn build_direct_link(link: &DownloadLinkWire) -> String {
    let mut hasher = Md5::new();
    hasher.update(SIGN_SALT.as_bytes());
    hasher.update(link.path[1..].as_bytes());
    hasher.update(link.s.as_bytes());
    let sign = hex::encode(hasher.finalize());

    format!("https://{}/get-mp3/{}/{}{}", link.host, sign, link.ts, link.path)
}
