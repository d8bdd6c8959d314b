use crate::extractors::VideoId;

/// Longest sanitized title used as a file stem
pub const MAX_FILENAME_LEN: usize = 200;

/// Characters most filesystems refuse in file names
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Collapse every run of whitespace into a single space and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sanitize a title for use as a file name.
///
/// Keeps ASCII letters, digits, space, `_` and `-`. Reserved filesystem
/// characters become `_`, anything else is dropped. The result is trimmed and
/// at most [`MAX_FILENAME_LEN`] characters; applying it twice changes nothing.
pub fn sanitize_filename(title: &str) -> String {
    let mapped: String = title
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '_' || c == '-' => Some(c),
            c if c.is_whitespace() => Some(' '),
            c if RESERVED_CHARS.contains(&c) => Some('_'),
            _ => None,
        })
        .collect();

    // Only ASCII survives the mapping, so byte and char counts agree
    let mut collapsed = collapse_whitespace(&mapped);
    collapsed.truncate(MAX_FILENAME_LEN);
    collapsed.trim_end().to_string()
}

/// File name for a transcript: sanitized title, or the video ID when nothing survives
pub fn transcript_filename(title: &str, video_id: &VideoId) -> String {
    let stem = sanitize_filename(title);
    if stem.is_empty() {
        format!("{}.txt", video_id)
    } else {
        format!("{}.txt", stem)
    }
}
