use std::fmt;
use url::Url;

pub mod youtube;

use crate::ResolutionError;

/// Length of every YouTube video ID
pub const VIDEO_ID_LEN: usize = 11;

/// Hosts serving `watch?v=`, `/embed/` and `/shorts/` URLs
const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "www.youtube-nocookie.com",
];

/// Short-link hosts where the ID is the first path segment
const SHORT_LINK_HOSTS: &[&str] = &["youtu.be", "www.youtu.be"];

/// Path prefixes followed by the video ID
const ID_PATH_PREFIXES: &[&str] = &["embed", "shorts", "live", "v"];

/// Canonical 11-character YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Accepts `candidate` only if it has the exact shape of a video ID
    fn parse(candidate: &str) -> Option<Self> {
        let valid = candidate.len() == VIDEO_ID_LEN
            && candidate
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');

        valid.then(|| Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this video
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve a YouTube URL or bare video ID into a [`VideoId`].
///
/// URL shapes are tried first; when none matches, the whole trimmed input is
/// treated as a bare ID. A URL that matches but carries a malformed ID is an
/// error, there is no attempt at partial recovery.
pub fn resolve_video_id(input: &str) -> Result<VideoId, ResolutionError> {
    let trimmed = input.trim();
    let candidate = match_url_pattern(trimmed);
    let candidate = candidate.as_deref().unwrap_or(trimmed);

    VideoId::parse(candidate).ok_or_else(|| ResolutionError {
        input: trimmed.to_string(),
    })
}

/// Extract the raw ID candidate from a recognized URL shape
fn match_url_pattern(input: &str) -> Option<String> {
    let url = parse_url(input)?;
    let host = url.host_str()?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    if SHORT_LINK_HOSTS.contains(&host) {
        return segments.first().map(|id| id.to_string());
    }

    if !YOUTUBE_HOSTS.contains(&host) {
        return None;
    }

    match segments.as_slice() {
        ["watch", ..] => url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned()),
        [prefix, id, ..] if ID_PATH_PREFIXES.contains(prefix) => Some(id.to_string()),
        _ => None,
    }
}

/// Parse `input` as an HTTP(S) URL, tolerating a missing scheme
fn parse_url(input: &str) -> Option<Url> {
    let parsed = if input.contains("://") {
        Url::parse(input).ok()?
    } else if input.contains('/') {
        Url::parse(&format!("https://{input}")).ok()?
    } else {
        return None;
    };

    matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}
