use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{OutputTarget, RunRequest};
use crate::extractors::{resolve_video_id, VideoId};
use crate::output::{self, TranscriptHeader};
use crate::{utils, FetchError, Result, TranscriptorError};

pub mod processor;

/// Language used when the caller does not ask for any
pub const DEFAULT_LANGUAGE: &str = "en";

/// One caption unit as returned by the caption track
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    /// Caption text
    pub text: String,

    /// Start time in seconds
    pub start: f64,

    /// Display duration in seconds
    pub duration: f64,
}

impl TranscriptEntry {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }
}

/// A caption track offered for a video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    pub language_code: String,

    /// Human readable language name, e.g. "English (auto-generated)"
    pub language_name: String,

    /// Auto-generated (ASR) rather than uploaded by the creator
    pub is_generated: bool,

    /// Opaque URL the track contents are fetched from
    pub base_url: String,
}

/// Ordered caption entries for a single language
#[derive(Debug, Clone)]
pub struct Transcript {
    pub video_id: VideoId,
    pub language_code: String,
    pub language_name: String,
    pub is_generated: bool,
    pub entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Time covered by the captions, in seconds
    pub fn duration(&self) -> f64 {
        self.entries
            .iter()
            .map(|entry| entry.start + entry.duration)
            .fold(0.0, f64::max)
    }
}

/// Ordered list of acceptable language codes. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePreference(Vec<String>);

impl LanguagePreference {
    /// Build a preference list, dropping blanks and repeated codes.
    /// An empty list falls back to [`DEFAULT_LANGUAGE`].
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut languages: Vec<String> = Vec::new();
        for code in codes {
            let code = code.as_ref().trim();
            if !code.is_empty() && !languages.iter().any(|known| known == code) {
                languages.push(code.to_string());
            }
        }

        if languages.is_empty() {
            Self::default()
        } else {
            Self(languages)
        }
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }
}

impl Default for LanguagePreference {
    fn default() -> Self {
        Self(vec![DEFAULT_LANGUAGE.to_string()])
    }
}

impl fmt::Display for LanguagePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

/// How the caption text is cleaned up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattingOptions {
    /// Remove bracketed non-speech annotations such as `[Music]`
    pub strip_stage_directions: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            strip_stage_directions: true,
        }
    }
}

/// External service that lists and downloads caption tracks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// List every caption track available for the video
    async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>, FetchError>;

    /// Download the entries of one track, in playback order
    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<TranscriptEntry>, FetchError>;
}

/// External service that knows a video's display title
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TitleSource: Send + Sync {
    async fn fetch_title(&self, video_id: &VideoId) -> anyhow::Result<String>;
}

/// Pick the first track matching the preference order.
///
/// For each language, a creator-uploaded track beats an auto-generated one.
/// Languages outside the preference list are never substituted.
pub fn select_track<'a>(
    tracks: &'a [CaptionTrack],
    languages: &LanguagePreference,
) -> Result<&'a CaptionTrack, FetchError> {
    for code in languages.codes() {
        let matching = |generated: bool| {
            tracks
                .iter()
                .find(|track| track.language_code == *code && track.is_generated == generated)
        };

        if let Some(track) = matching(false).or_else(|| matching(true)) {
            return Ok(track);
        }
    }

    let mut available: Vec<String> = Vec::new();
    for track in tracks {
        if !available.contains(&track.language_code) {
            available.push(track.language_code.clone());
        }
    }

    Err(FetchError::NoTranscriptForLanguage {
        requested: languages.codes().to_vec(),
        available,
    })
}

/// Applies the language policy on top of a [`TranscriptSource`]
pub struct TranscriptFetcher {
    source: Box<dyn TranscriptSource>,
}

impl TranscriptFetcher {
    pub fn new(source: Box<dyn TranscriptSource>) -> Self {
        Self { source }
    }

    /// List the tracks available for a video
    pub async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>, FetchError> {
        self.source.list_tracks(video_id).await
    }

    /// Fetch the transcript in the first available preferred language.
    /// One attempt, no retries.
    pub async fn fetch(
        &self,
        video_id: &VideoId,
        languages: &LanguagePreference,
    ) -> Result<Transcript, FetchError> {
        let tracks = self.source.list_tracks(video_id).await?;
        tracing::debug!(
            "Video {} offers {} caption track(s): {:?}",
            video_id,
            tracks.len(),
            tracks.iter().map(|t| t.language_code.as_str()).collect::<Vec<_>>()
        );

        let track = select_track(&tracks, languages)?;
        tracing::debug!(
            "Selected track {} ({}, generated: {})",
            track.language_code,
            track.language_name,
            track.is_generated
        );

        let entries = self.source.fetch_track(track).await?;

        Ok(Transcript {
            video_id: video_id.clone(),
            language_code: track.language_code.clone(),
            language_name: track.language_name.clone(),
            is_generated: track.is_generated,
            entries,
        })
    }
}

/// Look up the display title, falling back to the video ID on any failure
pub async fn resolve_title(titles: &dyn TitleSource, video_id: &VideoId) -> String {
    match titles.fetch_title(video_id).await {
        Ok(title) if !title.trim().is_empty() => title.trim().to_string(),
        Ok(_) => {
            tracing::debug!("Title for {} is blank, using the video ID", video_id);
            video_id.to_string()
        }
        Err(e) => {
            tracing::debug!("Could not fetch title for {}: {:#}", video_id, e);
            video_id.to_string()
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub video_id: VideoId,

    /// Language the transcript was delivered in
    pub language_code: String,

    /// Resolved title, only looked up when the transcript is saved
    pub title: Option<String>,

    /// Where the transcript was written, if it was
    pub saved_to: Option<PathBuf>,
}

/// Main pipeline: resolve, fetch, format, then print and save
pub struct TranscriptPipeline {
    fetcher: TranscriptFetcher,
    titles: Box<dyn TitleSource>,
    show_progress: bool,
}

impl TranscriptPipeline {
    pub fn new(source: Box<dyn TranscriptSource>, titles: Box<dyn TitleSource>) -> Self {
        Self {
            fetcher: TranscriptFetcher::new(source),
            titles,
            show_progress: false,
        }
    }

    /// Show a spinner on stderr while waiting on the network
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Resolve the input and list the caption tracks of the video
    pub async fn list_tracks(&self, input: &str) -> Result<(VideoId, Vec<CaptionTrack>)> {
        let video_id = resolve_video_id(input)?;
        tracing::debug!("Resolved video ID: {}", video_id);

        let spinner = self.spinner("Listing caption tracks...");
        let tracks = self.fetcher.list_tracks(&video_id).await;
        spinner.finish_and_clear();

        Ok((video_id, tracks?))
    }

    /// Run one request end to end.
    ///
    /// The formatted transcript is written to `console` before any file is
    /// saved, so a failed save still leaves the text on screen.
    pub async fn run<W: Write>(&self, request: &RunRequest, console: &mut W) -> Result<RunResult> {
        let video_id = resolve_video_id(&request.input)?;
        tracing::debug!("Resolved video ID: {}", video_id);

        let spinner = self.spinner("Fetching transcript...");
        let transcript = self.fetcher.fetch(&video_id, &request.languages).await;
        spinner.finish_and_clear();
        let transcript = transcript?;

        tracing::info!(
            "Fetched {} caption entries in {} covering {}",
            transcript.entries.len(),
            transcript.language_code,
            utils::format_duration(transcript.duration())
        );

        let body = output::format_transcript(&transcript, &request.formatting);
        output::print_to_console(console, &body).map_err(TranscriptorError::Console)?;

        let (title, saved_to) = match &request.target {
            OutputTarget::Console => (None, None),
            OutputTarget::Directory(dir) => {
                let title = resolve_title(self.titles.as_ref(), &video_id).await;
                let filename = utils::transcript_filename(&title, &video_id);
                let header = TranscriptHeader::new(&video_id, &title);
                let path = output::save_to_file(dir, &filename, &header, &body)?;
                (Some(title), Some(path))
            }
        };

        Ok(RunResult {
            video_id,
            language_code: transcript.language_code,
            title,
            saved_to,
        })
    }

    fn spinner(&self, message: &'static str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn track(code: &str, generated: bool) -> CaptionTrack {
        CaptionTrack {
            language_code: code.to_string(),
            language_name: code.to_uppercase(),
            is_generated: generated,
            base_url: format!("https://example.test/{code}/{generated}"),
        }
    }

    fn video_id() -> VideoId {
        resolve_video_id("abcdefghijk").unwrap()
    }

    /// Serves a fixed track list; every fetched track yields the same entries
    struct FakeSource {
        tracks: Vec<CaptionTrack>,
        entries: Vec<TranscriptEntry>,
        fetches: Arc<AtomicUsize>,
    }

    impl FakeSource {
        fn new(tracks: Vec<CaptionTrack>, texts: &[&str]) -> Self {
            let entries = texts
                .iter()
                .enumerate()
                .map(|(i, text)| TranscriptEntry::new(*text, i as f64 * 2.0, 2.0))
                .collect();
            Self {
                tracks,
                entries,
                fetches: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl TranscriptSource for FakeSource {
        async fn list_tracks(&self, _video_id: &VideoId) -> Result<Vec<CaptionTrack>, FetchError> {
            Ok(self.tracks.clone())
        }

        async fn fetch_track(&self, _track: &CaptionTrack) -> Result<Vec<TranscriptEntry>, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.clone())
        }
    }

    fn titled(title: &'static str) -> Box<dyn TitleSource> {
        let mut titles = MockTitleSource::new();
        titles
            .expect_fetch_title()
            .returning(move |_| Ok(title.to_string()));
        Box::new(titles)
    }

    fn request(input: &str, target: OutputTarget) -> RunRequest {
        RunRequest {
            input: input.to_string(),
            languages: LanguagePreference::default(),
            formatting: FormattingOptions::default(),
            target,
        }
    }

    #[test]
    fn test_language_preference_defaults_and_dedup() {
        assert_eq!(LanguagePreference::new(Vec::<String>::new()).codes(), ["en"]);
        assert_eq!(LanguagePreference::new(["", "  "]).codes(), ["en"]);
        assert_eq!(LanguagePreference::new(["de", " en ", "de"]).codes(), ["de", "en"]);
        assert_eq!(LanguagePreference::new(["de", "en"]).to_string(), "de, en");
    }

    #[test]
    fn test_select_track_prefers_manual_then_generated() {
        let tracks = vec![track("en", true), track("en", false), track("de", false)];
        let selected = select_track(&tracks, &LanguagePreference::default()).unwrap();
        assert_eq!(selected, &tracks[1]);

        let generated_only = vec![track("en", true)];
        let selected = select_track(&generated_only, &LanguagePreference::default()).unwrap();
        assert!(selected.is_generated);
    }

    #[test]
    fn test_select_track_follows_preference_order() {
        let tracks = vec![track("en", false), track("fr", true)];
        let languages = LanguagePreference::new(["fr", "en"]);
        assert_eq!(select_track(&tracks, &languages).unwrap().language_code, "fr");
    }

    #[test]
    fn test_select_track_never_substitutes_language() {
        let tracks = vec![track("es", false), track("es", true)];
        match select_track(&tracks, &LanguagePreference::default()) {
            Err(FetchError::NoTranscriptForLanguage { requested, available }) => {
                assert_eq!(requested, vec!["en".to_string()]);
                assert_eq!(available, vec!["es".to_string()]);
            }
            other => panic!("expected NoTranscriptForLanguage, got {:?}", other),
        }
    }

    #[test]
    fn test_select_track_does_not_match_regional_variants() {
        let tracks = vec![track("en-GB", false)];
        assert!(select_track(&tracks, &LanguagePreference::default()).is_err());
    }

    #[tokio::test]
    async fn test_fetcher_reports_missing_language_without_fetching() {
        let source = FakeSource::new(vec![track("es", false)], &["Hola"]);
        let fetches = source.fetches.clone();
        let fetcher = TranscriptFetcher::new(Box::new(source));

        let err = fetcher
            .fetch(&video_id(), &LanguagePreference::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FetchError::NoTranscriptForLanguage { ref requested, .. } if requested == &["en".to_string()]
        ));
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetcher_propagates_source_errors() {
        let mut source = MockTranscriptSource::new();
        source.expect_list_tracks().returning(|id| {
            Err(FetchError::TranscriptsDisabled {
                video_id: id.to_string(),
            })
        });
        source.expect_fetch_track().never();

        let fetcher = TranscriptFetcher::new(Box::new(source));
        let err = fetcher
            .fetch(&video_id(), &LanguagePreference::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TranscriptsDisabled { .. }));
    }

    #[tokio::test]
    async fn test_fetcher_returns_track_metadata() {
        let source = FakeSource::new(vec![track("en", true)], &["Hello", "world"]);
        let fetcher = TranscriptFetcher::new(Box::new(source));

        let transcript = fetcher
            .fetch(&video_id(), &LanguagePreference::default())
            .await
            .unwrap();

        assert_eq!(transcript.language_code, "en");
        assert!(transcript.is_generated);
        assert_eq!(transcript.entries.len(), 2);
        assert_eq!(transcript.duration(), 4.0);
    }

    #[tokio::test]
    async fn test_resolve_title_falls_back_to_video_id() {
        let mut failing = MockTitleSource::new();
        failing
            .expect_fetch_title()
            .returning(|_| Err(anyhow::anyhow!("HTTP 404")));
        assert_eq!(resolve_title(&failing, &video_id()).await, "abcdefghijk");

        let mut blank = MockTitleSource::new();
        blank.expect_fetch_title().returning(|_| Ok("   ".to_string()));
        assert_eq!(resolve_title(&blank, &video_id()).await, "abcdefghijk");

        assert_eq!(
            resolve_title(titled(" A Title ").as_ref(), &video_id()).await,
            "A Title"
        );
    }

    #[tokio::test]
    async fn test_run_saves_titled_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(vec![track("en", false)], &["Hello", "[Music]", "world"]);
        let pipeline = TranscriptPipeline::new(Box::new(source), titled("My Video: Part 1"));

        let mut console = Vec::new();
        let result = pipeline
            .run(
                &request(
                    "https://youtu.be/abcdefghijk",
                    OutputTarget::Directory(dir.path().to_path_buf()),
                ),
                &mut console,
            )
            .await
            .unwrap();

        assert_eq!(result.video_id.as_str(), "abcdefghijk");
        assert_eq!(result.title.as_deref(), Some("My Video: Part 1"));
        let path = result.saved_to.unwrap();
        assert_eq!(path, dir.path().join("My Video_ Part 1.txt"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            format!(
                "Video ID: abcdefghijk\nTitle: My Video: Part 1\nURL: https://www.youtube.com/watch?v=abcdefghijk\n\n{}\n\nHello world",
                "=".repeat(80)
            )
        );
        assert_eq!(String::from_utf8(console).unwrap(), "Hello world\n");
    }

    #[tokio::test]
    async fn test_run_creates_missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("transcripts").join("2024");
        let source = FakeSource::new(vec![track("en", false)], &["Hi"]);
        let pipeline = TranscriptPipeline::new(Box::new(source), titled("Nested"));

        let result = pipeline
            .run(
                &request("abcdefghijk", OutputTarget::Directory(nested.clone())),
                &mut Vec::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.saved_to.unwrap(), nested.join("Nested.txt"));
    }

    #[tokio::test]
    async fn test_run_console_only_writes_nothing() {
        let source = FakeSource::new(vec![track("en", false)], &["Hello", "[Music]", "world"]);
        let mut titles = MockTitleSource::new();
        titles.expect_fetch_title().never();
        let pipeline = TranscriptPipeline::new(Box::new(source), Box::new(titles));

        let mut req = request("abcdefghijk", OutputTarget::Console);
        req.formatting.strip_stage_directions = false;

        let mut console = Vec::new();
        let result = pipeline.run(&req, &mut console).await.unwrap();

        assert!(result.saved_to.is_none());
        assert!(result.title.is_none());
        assert_eq!(String::from_utf8(console).unwrap(), "Hello [Music] world\n");
    }

    #[tokio::test]
    async fn test_run_rejects_unresolvable_input() {
        let mut source = MockTranscriptSource::new();
        source.expect_list_tracks().never();
        let pipeline = TranscriptPipeline::new(Box::new(source), titled("unused"));

        let err = pipeline
            .run(&request("not a url", OutputTarget::Console), &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptorError::Resolution(_)));
    }

    #[tokio::test]
    async fn test_run_falls_back_to_id_filename_when_title_sanitizes_away() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(vec![track("en", false)], &["Hi"]);
        let pipeline = TranscriptPipeline::new(Box::new(source), titled("日本語"));

        let result = pipeline
            .run(
                &request("abcdefghijk", OutputTarget::Directory(dir.path().to_path_buf())),
                &mut Vec::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.saved_to.unwrap(), dir.path().join("abcdefghijk.txt"));
    }
}
