use regex::Regex;
use std::sync::OnceLock;

use crate::extractors::VideoId;
use crate::transcribe::{CaptionTrack, FormattingOptions, Transcript};
use crate::utils::collapse_whitespace;

/// Width of the separator between header and body
const SEPARATOR_WIDTH: usize = 80;

/// Metadata block written above the transcript body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptHeader {
    pub video_id: String,
    pub title: String,
    pub url: String,
}

impl TranscriptHeader {
    pub fn new(video_id: &VideoId, title: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            title: title.to_string(),
            url: video_id.watch_url(),
        }
    }
}

fn stage_direction_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[[^\]]+\]").expect("stage direction pattern is valid"))
}

/// Join the caption entries into one cleaned-up line of text.
///
/// Stage directions are removed from the joined text, so a bracketed token
/// split across two entries is still caught.
pub fn format_transcript(transcript: &Transcript, options: &FormattingOptions) -> String {
    let joined = transcript
        .entries
        .iter()
        .map(|entry| entry.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    format_text(&joined, options)
}

/// Apply the formatting options to raw caption text
pub fn format_text(text: &str, options: &FormattingOptions) -> String {
    if options.strip_stage_directions {
        collapse_whitespace(&stage_direction_pattern().replace_all(text, ""))
    } else {
        collapse_whitespace(text)
    }
}

/// Render the header block, separator line included
pub fn format_header(header: &TranscriptHeader) -> String {
    format!(
        "Video ID: {}\nTitle: {}\nURL: {}\n\n{}\n\n",
        header.video_id,
        header.title,
        header.url,
        "=".repeat(SEPARATOR_WIDTH)
    )
}

/// One line per caption track: code, name and whether it is generated
pub fn format_track_list(tracks: &[CaptionTrack]) -> String {
    let width = tracks
        .iter()
        .map(|track| track.language_code.len())
        .max()
        .unwrap_or(0);

    tracks
        .iter()
        .map(|track| {
            let kind = if track.is_generated { "generated" } else { "manual" };
            format!(
                "{:<width$}  {:<9}  {}",
                track.language_code,
                kind,
                track.language_name,
                width = width
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::resolve_video_id;
    use crate::transcribe::TranscriptEntry;

    fn transcript(texts: &[&str]) -> Transcript {
        Transcript {
            video_id: resolve_video_id("abcdefghijk").unwrap(),
            language_code: "en".to_string(),
            language_name: "English".to_string(),
            is_generated: false,
            entries: texts
                .iter()
                .map(|text| TranscriptEntry::new(*text, 0.0, 1.0))
                .collect(),
        }
    }

    const STRIP: FormattingOptions = FormattingOptions {
        strip_stage_directions: true,
    };
    const KEEP: FormattingOptions = FormattingOptions {
        strip_stage_directions: false,
    };

    #[test]
    fn test_strips_stage_directions() {
        let t = transcript(&["Hello", "[Music]", "world"]);
        assert_eq!(format_transcript(&t, &STRIP), "Hello world");
        assert_eq!(format_transcript(&t, &KEEP), "Hello [Music] world");
    }

    #[test]
    fn test_strips_inline_and_multiword_directions() {
        let t = transcript(&["so [Applause] thank you", "[upbeat music playing]", "next"]);
        assert_eq!(format_transcript(&t, &STRIP), "so thank you next");
    }

    #[test]
    fn test_strips_direction_split_across_entries() {
        let t = transcript(&["welcome [Light", "Music] everyone"]);
        assert_eq!(format_transcript(&t, &STRIP), "welcome everyone");
    }

    #[test]
    fn test_collapses_whitespace_and_newlines() {
        let t = transcript(&["  line one\nline two ", "", "\tthree"]);
        assert_eq!(format_transcript(&t, &KEEP), "line one line two three");
        assert_eq!(format_transcript(&transcript(&[]), &STRIP), "");
    }

    #[test]
    fn test_empty_brackets_are_kept() {
        assert_eq!(format_text("a [] b", &STRIP), "a [] b");
    }

    #[test]
    fn test_header_layout() {
        let id = resolve_video_id("abcdefghijk").unwrap();
        let header = format_header(&TranscriptHeader::new(&id, "A Title"));
        let lines: Vec<&str> = header.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Video ID: abcdefghijk",
                "Title: A Title",
                "URL: https://www.youtube.com/watch?v=abcdefghijk",
                "",
                "================================================================================",
                "",
            ]
        );
        assert!(header.ends_with("=\n\n"));
    }

    #[test]
    fn test_track_list() {
        let tracks = vec![
            CaptionTrack {
                language_code: "en".to_string(),
                language_name: "English".to_string(),
                is_generated: false,
                base_url: String::new(),
            },
            CaptionTrack {
                language_code: "pt-BR".to_string(),
                language_name: "Portuguese (Brazil)".to_string(),
                is_generated: true,
                base_url: String::new(),
            },
        ];
        assert_eq!(
            format_track_list(&tracks),
            "en     manual     English\npt-BR  generated  Portuguese (Brazil)"
        );
    }
}
