//! Source identity resolution.
//!
//! Turns a user-supplied reference (a video URL, an uploaded file or a
//! browser recording) into a [`SourceIdentity`]: the stable key under which
//! downloaded audio and cloned voices are cached.

mod short_form;
mod upload;
mod youtube;

pub use short_form::ShortFormMatcher;
pub use upload::{check_audio_size, content_type_for, UploadedAudio};
pub use youtube::YoutubeMatcher;

use crate::error::{Result, VoicecastError};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Stable cache key for one logical audio source.
///
/// Only `[A-Za-z0-9_-]` characters are allowed, so an identity can be used
/// directly as a file stem and as a remote voice name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceIdentity(String);

impl SourceIdentity {
    /// Validate an externally supplied identity.
    pub fn parse(value: &str) -> Result<Self> {
        let valid = !value.is_empty()
            && value.len() <= 64
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if valid {
            Ok(Self(value.to_string()))
        } else {
            Err(VoicecastError::InvalidInput(format!(
                "Invalid source identity: {:?}",
                value
            )))
        }
    }

    /// A fresh random identity, used for uploads and recordings.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SourceIdentity {
    type Error = VoicecastError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<SourceIdentity> for String {
    fn from(identity: SourceIdentity) -> Self {
        identity.0
    }
}

/// Hosting platform a URL was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    YouTube,
    YouTubeShorts,
    TikTok,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::YouTube => write!(f, "youtube"),
            Platform::YouTubeShorts => write!(f, "youtube-shorts"),
            Platform::TikTok => write!(f, "tiktok"),
        }
    }
}

/// Where the audio for a request comes from.
#[derive(Debug, Clone)]
pub enum SourceReference {
    /// A video page URL, downloaded with yt-dlp.
    Url(String),
    /// A user-uploaded audio file.
    Upload(UploadedAudio),
    /// Raw bytes of a browser microphone recording (webm).
    Recording(Vec<u8>),
}

impl SourceReference {
    /// Short description for logs; never includes payload bytes.
    pub fn describe(&self) -> String {
        match self {
            SourceReference::Url(url) => url.clone(),
            SourceReference::Upload(upload) => {
                format!("upload ({} bytes, .{})", upload.bytes().len(), upload.extension())
            }
            SourceReference::Recording(bytes) => format!("recording ({} bytes)", bytes.len()),
        }
    }
}

/// Recognises one family of hosting URLs.
pub trait PlatformMatcher: Send + Sync {
    /// Extract the platform and identity token from a parsed URL, if it
    /// belongs to this family.
    fn match_url(&self, url: &Url) -> Option<(Platform, String)>;
}

/// Maps references to identities using a prioritized list of matchers.
pub struct Resolver {
    matchers: Vec<Box<dyn PlatformMatcher>>,
}

impl Resolver {
    /// Resolver with the built-in matchers: long-form video hosting first,
    /// then short-form hosting.
    pub fn new() -> Self {
        Self::with_matchers(vec![
            Box::new(YoutubeMatcher::new()),
            Box::new(ShortFormMatcher::new()),
        ])
    }

    pub fn with_matchers(matchers: Vec<Box<dyn PlatformMatcher>>) -> Self {
        Self { matchers }
    }

    /// Resolve a URL to an identity. The first matching platform wins.
    pub fn resolve_url(&self, input: &str) -> Option<(Platform, SourceIdentity)> {
        let url = Url::parse(input.trim()).ok()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return None;
        }

        self.matchers
            .iter()
            .find_map(|matcher| matcher.match_url(&url))
            .map(|(platform, token)| (platform, SourceIdentity(token)))
    }

    /// Resolve any reference. Uploads and recordings always get a new identity.
    pub fn resolve(&self, reference: &SourceReference) -> Result<SourceIdentity> {
        match reference {
            SourceReference::Url(url) => self
                .resolve_url(url)
                .map(|(platform, identity)| {
                    debug!("Matched {} video {}", platform, identity);
                    identity
                })
                .ok_or_else(|| {
                    VoicecastError::InvalidInput(format!("Unsupported or invalid video URL: {}", url))
                }),
            SourceReference::Upload(_) | SourceReference::Recording(_) => {
                Ok(SourceIdentity::generate())
            }
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Host without a leading `www.`, lowercased.
pub(crate) fn bare_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(resolver: &Resolver, url: &str) -> Option<String> {
        resolver.resolve_url(url).map(|(_, i)| i.to_string())
    }

    #[test]
    fn test_short_and_long_links_agree() {
        let resolver = Resolver::new();
        assert_eq!(id(&resolver, "https://youtu.be/abcdefghijk"), Some("abcdefghijk".into()));
        assert_eq!(
            id(&resolver, "https://www.youtube.com/watch?v=abcdefghijk"),
            Some("abcdefghijk".into())
        );
    }

    #[test]
    fn test_query_order_does_not_matter() {
        let resolver = Resolver::new();
        let a = id(&resolver, "https://www.youtube.com/watch?v=abcdefghijk&t=42s");
        let b = id(&resolver, "https://www.youtube.com/watch?t=42s&v=abcdefghijk");
        let c = id(&resolver, "https://youtube.com/watch?feature=share&list=PL1&v=abcdefghijk");
        assert_eq!(a, Some("abcdefghijk".into()));
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_unknown_host_is_not_found() {
        let resolver = Resolver::new();
        assert!(resolver.resolve_url("https://example.com/x").is_none());
        assert!(resolver.resolve_url("not a url").is_none());
        assert!(resolver.resolve_url("ftp://youtu.be/abcdefghijk").is_none());

        let err = resolver
            .resolve(&SourceReference::Url("https://example.com/x".into()))
            .unwrap_err();
        assert!(matches!(err, VoicecastError::InvalidInput(_)));
    }

    #[test]
    fn test_first_matcher_wins() {
        let resolver = Resolver::new();
        let (platform, identity) = resolver
            .resolve_url("https://www.youtube.com/shorts/abcdefghijk")
            .unwrap();
        assert_eq!(platform, Platform::YouTubeShorts);
        assert_eq!(identity.as_str(), "abcdefghijk");

        let (platform, _) = resolver
            .resolve_url("https://youtu.be/abcdefghijk")
            .unwrap();
        assert_eq!(platform, Platform::YouTube);
    }

    #[test]
    fn test_uploads_are_never_deduplicated() {
        let resolver = Resolver::new();
        let a = resolver.resolve(&SourceReference::Recording(vec![1, 2, 3])).unwrap();
        let b = resolver.resolve(&SourceReference::Recording(vec![1, 2, 3])).unwrap();
        assert_ne!(a, b);
        assert!(SourceIdentity::parse(a.as_str()).is_ok());
    }

    #[test]
    fn test_identity_rejects_path_characters() {
        assert!(SourceIdentity::parse("abcdefghijk").is_ok());
        assert!(SourceIdentity::parse("tt_7234567890123456789").is_ok());
        assert!(SourceIdentity::parse("../etc/passwd").is_err());
        assert!(SourceIdentity::parse("a b").is_err());
        assert!(SourceIdentity::parse("").is_err());
    }
}
