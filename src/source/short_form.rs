//! Short-form video hosting matcher (YouTube Shorts, TikTok).

use super::{bare_host, Platform, PlatformMatcher};
use regex::Regex;
use url::Url;

/// Matches YouTube Shorts and TikTok video URLs.
///
/// Shorts share the YouTube video ID space, so a Short resolves to the same
/// identity as its watch URL. TikTok IDs get a `tt_` prefix to keep the two
/// namespaces apart.
pub struct ShortFormMatcher {
    shorts_id: Regex,
    tiktok_id: Regex,
}

impl ShortFormMatcher {
    pub fn new() -> Self {
        Self {
            shorts_id: Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("Invalid regex"),
            tiktok_id: Regex::new(r"^[0-9]{19}$").expect("Invalid regex"),
        }
    }
}

impl Default for ShortFormMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformMatcher for ShortFormMatcher {
    fn match_url(&self, url: &Url) -> Option<(Platform, String)> {
        let host = bare_host(url)?;
        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

        match (host.as_str(), segments.as_slice()) {
            ("youtube.com" | "m.youtube.com", ["shorts", id]) if self.shorts_id.is_match(id) => {
                Some((Platform::YouTubeShorts, id.to_string()))
            }
            ("tiktok.com" | "m.tiktok.com", [user, "video", id])
                if user.starts_with('@') && self.tiktok_id.is_match(id) =>
            {
                Some((Platform::TikTok, format!("tt_{}", id)))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(input: &str) -> Option<String> {
        ShortFormMatcher::new()
            .match_url(&Url::parse(input).unwrap())
            .map(|(_, id)| id)
    }

    #[test]
    fn test_shorts() {
        assert_eq!(matched("https://youtube.com/shorts/abcdefghijk?feature=share"), Some("abcdefghijk".into()));
        assert_eq!(matched("https://www.youtube.com/shorts/abc"), None);
    }

    #[test]
    fn test_tiktok() {
        assert_eq!(
            matched("https://www.tiktok.com/@someone/video/7234567890123456789?lang=en"),
            Some("tt_7234567890123456789".into())
        );
        assert_eq!(matched("https://www.tiktok.com/someone/video/7234567890123456789"), None);
        assert_eq!(matched("https://www.tiktok.com/@someone/video/123"), None);
    }
}
