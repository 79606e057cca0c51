//! YouTube (long-form video hosting) matcher.

use super::{bare_host, Platform, PlatformMatcher};
use regex::Regex;
use url::Url;

const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "m.youtube.com", "music.youtube.com"];

/// Matches watch, embed and short-link YouTube URLs.
pub struct YoutubeMatcher {
    video_id_regex: Regex,
}

impl YoutubeMatcher {
    pub fn new() -> Self {
        // Video IDs are exactly 11 URL-safe base64 characters
        let video_id_regex = Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("Invalid regex");
        Self { video_id_regex }
    }

    fn valid_id(&self, candidate: &str) -> Option<String> {
        self.video_id_regex
            .is_match(candidate)
            .then(|| candidate.to_string())
    }
}

impl Default for YoutubeMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformMatcher for YoutubeMatcher {
    fn match_url(&self, url: &Url) -> Option<(Platform, String)> {
        let host = bare_host(url)?;
        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

        let id = if host == "youtu.be" {
            match segments.as_slice() {
                [id] => self.valid_id(id),
                _ => None,
            }
        } else if YOUTUBE_HOSTS.contains(&host.as_str()) {
            match segments.as_slice() {
                ["watch"] => url
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .and_then(|(_, value)| self.valid_id(&value)),
                ["embed", id] | ["v", id] | ["live", id] => self.valid_id(id),
                _ => None,
            }
        } else {
            None
        };

        id.map(|id| (Platform::YouTube, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(input: &str) -> Option<String> {
        YoutubeMatcher::new()
            .match_url(&Url::parse(input).unwrap())
            .map(|(_, id)| id)
    }

    #[test]
    fn test_url_formats() {
        assert_eq!(matched("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".into()));
        assert_eq!(matched("https://youtu.be/dQw4w9WgXcQ?si=xyz"), Some("dQw4w9WgXcQ".into()));
        assert_eq!(matched("https://youtube.com/embed/dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".into()));
        assert_eq!(matched("https://m.youtube.com/watch?v=dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".into()));
    }

    #[test]
    fn test_rejects_malformed_ids() {
        assert_eq!(matched("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(matched("https://www.youtube.com/watch?list=PL123"), None);
        assert_eq!(matched("https://youtu.be/dQw4w9WgXcQ/extra"), None);
        assert_eq!(matched("https://www.youtube.com/playlist?list=PLtest"), None);
        assert_eq!(matched("https://notyoutube.com/watch?v=dQw4w9WgXcQ"), None);
    }
}
