//! Wire models for the catalog REST API
//!
//! Everything the API returns is wrapped in `{"result": ...}`; the
//! low-level layer unwraps that and hands these structs to the client,
//! which converts them to the core model.

use serde::{Deserialize, Deserializer};

/// Flexible deserializer for IDs the API sends as either strings or numbers
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(Error::custom("ID must be a string or number")),
    }
}

/// Envelope around every API response body
#[derive(Debug, Deserialize)]
pub(crate) struct ResultWrapper<T> {
    pub result: T,
}

/// An artist as the API returns it
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistWire {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
}

/// An album reference on a track
#[derive(Debug, Clone, Deserialize)]
pub struct AlbumWire {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// A track as the API returns it
#[derive(Debug, Clone, Deserialize)]
pub struct TrackWire {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artists: Vec<ArtistWire>,
    #[serde(default)]
    pub albums: Vec<AlbumWire>,
    #[serde(rename = "durationMs", default)]
    pub duration_ms: u64,
}

impl From<TrackWire> for voxcore::Track {
    fn from(wire: TrackWire) -> Self {
        voxcore::Track {
            id: wire.id,
            title: wire.title,
            artists: wire.artists.into_iter().map(|a| a.name).collect(),
            album_id: wire.albums.into_iter().next().map(|a| a.id),
            duration_ms: wire.duration_ms,
            candidates: vec![],
        }
    }
}

/// Track search results section
#[derive(Debug, Deserialize)]
pub(crate) struct SearchWire {
    #[serde(default)]
    pub tracks: Option<SearchTracksWire>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchTracksWire {
    #[serde(default)]
    pub results: Vec<TrackWire>,
}

/// One download option for a track
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadInfoWire {
    pub codec: String,
    #[serde(rename = "bitrateInKbps")]
    pub bitrate_in_kbps: u32,
    #[serde(rename = "downloadInfoUrl")]
    pub download_info_url: String,
}

impl From<DownloadInfoWire> for voxcore::DownloadCandidate {
    fn from(wire: DownloadInfoWire) -> Self {
        voxcore::DownloadCandidate {
            codec: wire.codec,
            bitrate_kbps: wire.bitrate_in_kbps,
            url: wire.download_info_url,
        }
    }
}

/// Storage coordinates resolved from a download-info URL
///
/// The direct link is assembled from these plus an md5 signature; see
/// [`crate::api::track`].
#[derive(Debug, Deserialize)]
pub(crate) struct DownloadLinkWire {
    pub host: String,
    pub path: String,
    pub ts: String,
    pub s: String,
}

/// Station descriptor from the station-info endpoint
#[derive(Debug, Deserialize)]
pub struct StationInfoWire {
    pub station: StationWire,
}

#[derive(Debug, Deserialize)]
pub struct StationWire {
    #[serde(rename = "idForFrom")]
    pub id_for_from: String,
}

/// One batch of queued station tracks
#[derive(Debug, Deserialize)]
pub struct BatchWire {
    #[serde(rename = "batchId")]
    pub batch_id: String,
    #[serde(default)]
    pub sequence: Vec<SequenceItemWire>,
}

#[derive(Debug, Deserialize)]
pub struct SequenceItemWire {
    pub track: TrackWire,
}

/// Account section of the status endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct StatusWire {
    pub account: AccountWire,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountWire {
    #[serde(deserialize_with = "deserialize_id")]
    pub uid: String,
    #[serde(default)]
    pub login: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_ids_accept_numbers_and_strings() {
        let numeric: TrackWire =
            serde_json::from_str(r#"{"id": 42, "title": "A", "durationMs": 1000}"#).unwrap();
        assert_eq!(numeric.id, "42");

        let string: TrackWire =
            serde_json::from_str(r#"{"id": "42", "title": "A", "durationMs": 1000}"#).unwrap();
        assert_eq!(string.id, "42");
    }

    #[test]
    fn track_converts_to_core_model() {
        let wire: TrackWire = serde_json::from_str(
            r#"{
                "id": 7,
                "title": "Song",
                "artists": [{"id": 1, "name": "A"}, {"id": 2, "name": "B"}],
                "albums": [{"id": 99, "title": "Album"}],
                "durationMs": 215000
            }"#,
        )
        .unwrap();

        let track: voxcore::Track = wire.into();
        assert_eq!(track.id, "7");
        assert_eq!(track.artists, vec!["A", "B"]);
        assert_eq!(track.album_id.as_deref(), Some("99"));
        assert_eq!(track.duration_ms, 215_000);
        assert!(track.candidates.is_empty());
    }

    #[test]
    fn download_info_converts_to_candidate() {
        let wire: DownloadInfoWire = serde_json::from_str(
            r#"{"codec": "mp3", "bitrateInKbps": 320, "downloadInfoUrl": "https://x/y"}"#,
        )
        .unwrap();
        let candidate: voxcore::DownloadCandidate = wire.into();
        assert_eq!(candidate.codec, "mp3");
        assert_eq!(candidate.bitrate_kbps, 320);
    }
}
