// Video-ID extraction from the URL shapes people actually paste into sheets.
//
// A video ID is always 11 characters of [A-Za-z0-9_-]. The recognized URL
// forms are watch?v=, youtu.be/, shorts/, embed/, and live/; a bare ID is
// accepted too since some sheets carry the ID directly.

use regex_lite::Regex;
use std::sync::OnceLock;

const ID_PATTERN: &str = "[A-Za-z0-9_-]{11}";

fn patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // watch URLs — v= may appear anywhere in the query string
            format!(r"[?&]v=({ID_PATTERN})"),
            // short links
            format!(r"youtu\.be/({ID_PATTERN})"),
            // shorts, embeds, live streams
            format!(r"/shorts/({ID_PATTERN})"),
            format!(r"/embed/({ID_PATTERN})"),
            format!(r"/live/({ID_PATTERN})"),
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern"))
        .collect()
    })
}

/// Extract the 11-character video ID from a cell's text.
///
/// Returns `None` when no recognized pattern matches — the scheduler
/// records those rows as invalid without spending an API call.
pub fn extract_video_id(raw: &str) -> Option<String> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    for re in patterns() {
        if let Some(caps) = re.captures(text) {
            return Some(caps[1].to_string());
        }
    }

    // A bare ID — must be exactly the ID shape with nothing around it.
    static BARE: OnceLock<Regex> = OnceLock::new();
    let bare = BARE.get_or_init(|| {
        Regex::new(&format!("^{ID_PATTERN}$")).expect("static pattern")
    });
    if bare.is_match(text) {
        return Some(text.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_watch_url_with_extra_params() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?t=42&v=dQw4w9WgXcQ&list=PL123"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_short_link() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=share"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_shorts_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/abc123XYZ_-"),
            Some("abc123XYZ_-".to_string())
        );
    }

    #[test]
    fn test_embed_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_live_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/live/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_bare_id() {
        assert_eq!(
            extract_video_id("dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_surrounding_whitespace() {
        assert_eq!(
            extract_video_id("  https://youtu.be/dQw4w9WgXcQ \n"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_rejects_empty_and_garbage() {
        assert_eq!(extract_video_id(""), None);
        assert_eq!(extract_video_id("   "), None);
        assert_eq!(extract_video_id("not a url"), None);
        assert_eq!(extract_video_id("https://example.com/watch?v=nope"), None);
    }

    #[test]
    fn test_rejects_wrong_length_ids() {
        // 10 and 12 characters — neither is a valid ID
        assert_eq!(extract_video_id("dQw4w9WgXc"), None);
        assert_eq!(extract_video_id("dQw4w9WgXcQQ"), None);
    }

    #[test]
    fn test_channel_url_is_not_a_video() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/@somechannel"),
            None
        );
    }
}
