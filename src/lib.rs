//! yt-transcript - A Rust CLI tool for extracting YouTube caption transcripts
//!
//! This library resolves YouTube URLs or bare video IDs, fetches the caption track
//! for an explicit list of preferred languages, and turns it into a plain text file.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod output;
pub mod transcribe;
pub mod utils;

use std::path::PathBuf;

pub use cli::Cli;
pub use config::{Config, OutputTarget, RunRequest};
pub use extractors::{resolve_video_id, VideoId};
pub use transcribe::{
    CaptionTrack, FormattingOptions, LanguagePreference, RunResult, TitleSource, Transcript,
    TranscriptEntry, TranscriptFetcher, TranscriptPipeline, TranscriptSource,
};

/// Result type used throughout the library
pub type Result<T, E = TranscriptorError> = std::result::Result<T, E>;

/// The input could not be turned into a video ID
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Not a YouTube URL or video ID: '{input}'")]
pub struct ResolutionError {
    pub input: String,
}

/// Failures surfaced by the transcript service
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("Transcripts are disabled for video {video_id}")]
    TranscriptsDisabled { video_id: String },

    #[error("No {} transcript found for this video{}", .requested.join(", "), available_hint(.available))]
    NoTranscriptForLanguage {
        requested: Vec<String>,
        available: Vec<String>,
    },

    #[error("Video {video_id} is unavailable: {reason}")]
    VideoUnavailable { video_id: String, reason: String },

    #[error("YouTube is blocking requests from this IP, wait 15-30 minutes and try again")]
    RateLimited,

    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response from YouTube: {0}")]
    MalformedResponse(String),
}

fn available_hint(available: &[String]) -> String {
    if available.is_empty() {
        String::new()
    } else {
        format!(" (available: {})", available.join(", "))
    }
}

/// Top-level error for one run of the tool
#[derive(thiserror::Error, Debug)]
pub enum TranscriptorError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to write transcript to the console: {0}")]
    Console(#[source] std::io::Error),

    #[error("Failed to save transcript to {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
