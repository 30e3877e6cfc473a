//! Content type detection from file extensions.

use std::path::Path;

/// Fallback for anything we don't recognize.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Guess a content type from the extension of a path or URL.
///
/// Query strings and fragments are ignored so that remote URLs resolve the
/// same way as local paths.
pub fn guess_content_type(source: &str) -> &'static str {
    let path = source
        .split(['?', '#'])
        .next()
        .unwrap_or(source);

    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mp4" | "m4v") => "video/mp4",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("ts" | "m2ts") => "video/mp2t",
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("m4a") => "audio/mp4",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("wav") => "audio/wav",
        Some("vtt") => "text/vtt",
        Some("srt") => "application/x-subrip",
        Some("ttml" | "dfxp") => "application/ttml+xml",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_video_types() {
        assert_eq!(guess_content_type("movie.mp4"), "video/mp4");
        assert_eq!(guess_content_type("/tmp/Movie.MKV"), "video/x-matroska");
        assert_eq!(guess_content_type("clip.webm"), "video/webm");
    }

    #[test]
    fn test_guess_subtitle_types() {
        assert_eq!(guess_content_type("subs.vtt"), "text/vtt");
        assert_eq!(guess_content_type("subs.srt"), "application/x-subrip");
    }

    #[test]
    fn test_guess_ignores_query_string() {
        assert_eq!(
            guess_content_type("https://example.com/a/video.mp4?token=abc"),
            "video/mp4"
        );
    }

    #[test]
    fn test_guess_unknown() {
        assert_eq!(guess_content_type("README"), DEFAULT_CONTENT_TYPE);
        assert_eq!(guess_content_type("data.xyz"), DEFAULT_CONTENT_TYPE);
    }
}
