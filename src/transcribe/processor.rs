//! Decoding of the raw YouTube payloads into caption tracks and entries.

use serde::Deserialize;

use super::{CaptionTrack, TranscriptEntry};
use crate::extractors::VideoId;
use crate::FetchError;

/// Innertube player response, reduced to the fields used here
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    #[serde(default)]
    playability_status: Option<PlayabilityStatus>,

    #[serde(default)]
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer", default)]
    tracklist: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<RawCaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCaptionTrack {
    base_url: String,
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    name: Option<TrackName>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    #[serde(default)]
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

impl TrackName {
    fn text(&self) -> Option<String> {
        self.simple_text.clone().or_else(|| {
            let joined: String = self.runs.iter().map(|run| run.text.as_str()).collect();
            (!joined.is_empty()).then_some(joined)
        })
    }
}

impl From<RawCaptionTrack> for CaptionTrack {
    fn from(raw: RawCaptionTrack) -> Self {
        let language_name = raw
            .name
            .as_ref()
            .and_then(TrackName::text)
            .unwrap_or_else(|| raw.language_code.clone());

        CaptionTrack {
            language_code: raw.language_code,
            language_name,
            is_generated: raw.kind.as_deref() == Some("asr"),
            base_url: raw.base_url,
        }
    }
}

/// Map the playability verdict and caption list of a player response
pub fn caption_tracks(
    video_id: &VideoId,
    response: PlayerResponse,
) -> Result<Vec<CaptionTrack>, FetchError> {
    if let Some(status) = &response.playability_status {
        check_playability(video_id, status)?;
    }

    let tracks: Vec<CaptionTrack> = response
        .captions
        .and_then(|captions| captions.tracklist)
        .map(|tracklist| tracklist.caption_tracks)
        .unwrap_or_default()
        .into_iter()
        .map(CaptionTrack::from)
        .collect();

    if tracks.is_empty() {
        return Err(FetchError::TranscriptsDisabled {
            video_id: video_id.to_string(),
        });
    }

    Ok(tracks)
}

fn check_playability(video_id: &VideoId, status: &PlayabilityStatus) -> Result<(), FetchError> {
    if status.status == "OK" {
        return Ok(());
    }

    let reason = status
        .reason
        .clone()
        .unwrap_or_else(|| status.status.to_lowercase());

    // YouTube answers flagged IPs with a login wall instead of an HTTP error
    if reason.contains("not a bot") {
        return Err(FetchError::RateLimited);
    }

    Err(FetchError::VideoUnavailable {
        video_id: video_id.to_string(),
        reason,
    })
}

/// Caption track contents in YouTube's `json3` format
#[derive(Debug, Default, Deserialize)]
pub struct Json3Payload {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Vec<Json3Segment>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

/// Turn `json3` events into entries, skipping events without visible text
pub fn transcript_entries(payload: Json3Payload) -> Vec<TranscriptEntry> {
    payload
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|seg| seg.utf8.as_str()).collect();
            let text = text.trim();
            if text.is_empty() {
                return None;
            }

            Some(TranscriptEntry::new(
                text,
                event.t_start_ms as f64 / 1000.0,
                event.d_duration_ms as f64 / 1000.0,
            ))
        })
        .collect()
}
