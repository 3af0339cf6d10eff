//! Radio endpoints: station info, queued batches, feedback and telemetry
//!
//! The recommendation engine only stays coherent if it hears about what
//! actually played: every batch start, track start and track finish goes
//! back through the feedback endpoint, and each play start/finish through
//! the play-audio telemetry endpoint.

use super::CatalogApi;
use crate::error::Result;
use crate::models::{BatchWire, StationInfoWire};
use chrono::Utc;
use serde_json::{Value, json};

impl CatalogApi {
    /// Fetch station descriptors, including the `from` context id
    pub async fn station_info(&self, station_id: &str) -> Result<Vec<StationInfoWire>> {
        self.get(&format!("/rotor/station/{station_id}/info"), &[])
            .await
    }

    /// Fetch a batch of queued tracks for a station
    ///
    /// `queue` carries the id of the track that just finished so the
    /// engine avoids immediate repeats.
    pub async fn station_tracks(&self, station_id: &str, queue: Option<&str>) -> Result<BatchWire> {
        let mut params = vec![("settings2", "true")];
        if let Some(seed) = queue {
            params.push(("queue", seed));
        }
        self.get(&format!("/rotor/station/{station_id}/tracks"), &params)
            .await
    }

    /// Report that a radio session started on a station
    pub async fn feedback_radio_started(
        &self,
        station_id: &str,
        from: &str,
        batch_id: &str,
    ) -> Result<()> {
        let body = json!({
            "type": "radioStarted",
            "timestamp": Utc::now().to_rfc3339(),
            "from": from,
        });
        self.send_feedback(station_id, batch_id, &body).await
    }

    /// Report that a batch track started playing
    pub async fn feedback_track_started(
        &self,
        station_id: &str,
        batch_id: &str,
        track_id: &str,
    ) -> Result<()> {
        let body = json!({
            "type": "trackStarted",
            "timestamp": Utc::now().to_rfc3339(),
            "trackId": track_id,
        });
        self.send_feedback(station_id, batch_id, &body).await
    }

    /// Report that a batch track finished playing
    pub async fn feedback_track_finished(
        &self,
        station_id: &str,
        batch_id: &str,
        track_id: &str,
        total_played_seconds: f64,
    ) -> Result<()> {
        let body = json!({
            "type": "trackFinished",
            "timestamp": Utc::now().to_rfc3339(),
            "trackId": track_id,
            "totalPlayedSeconds": total_played_seconds,
        });
        self.send_feedback(station_id, batch_id, &body).await
    }

    async fn send_feedback(&self, station_id: &str, batch_id: &str, body: &Value) -> Result<()> {
        let _: String = self
            .post_json(
                &format!("/rotor/station/{station_id}/feedback"),
                &[("batch-id", batch_id)],
                body,
            )
            .await?;
        Ok(())
    }

    /// Send play-audio telemetry for one track play
    ///
    /// `played_seconds`/`end_position_seconds` are 0 at start and the full
    /// track length at finish.
    #[allow(clippy::too_many_arguments)]
    pub async fn play_audio(
        &self,
        track_id: &str,
        album_id: Option<&str>,
        play_id: &str,
        from: &str,
        track_length_seconds: f64,
        played_seconds: f64,
        end_position_seconds: f64,
    ) -> Result<()> {
        let timestamp = Utc::now().to_rfc3339();
        let uid = self.uid().unwrap_or_default().to_string();
        let track_length = track_length_seconds.to_string();
        let played = played_seconds.to_string();
        let end_position = end_position_seconds.to_string();

        let mut params = vec![
            ("track-id", track_id),
            ("play-id", play_id),
            ("uid", uid.as_str()),
            ("from", from),
            ("timestamp", timestamp.as_str()),
            ("track-length-seconds", track_length.as_str()),
            ("total-played-seconds", played.as_str()),
            ("end-position-seconds", end_position.as_str()),
        ];
        if let Some(album) = album_id {
            params.push(("album-id", album));
        }

        let _: String = self.post("/play-audio", &params).await?;
        Ok(())
    }
}
