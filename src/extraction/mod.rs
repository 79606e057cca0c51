//! Reference text extraction.
//!
//! Reference-conditioned synthesis needs the words spoken in the reference
//! clip. Extractors turn a clip into that text.

mod whisper;

pub use whisper::WhisperExtractor;

use crate::config::{ExtractionProvider, ExtractionSettings};
use crate::error::{Result, VoicecastError};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Where the reference clip can be read from.
#[derive(Debug, Clone, Copy)]
pub enum ReferenceAudio<'a> {
    Remote(&'a str),
    Local(&'a Path),
}

/// Obtains a transcript of a reference clip.
#[async_trait]
pub trait ReferenceExtractor: Send + Sync {
    async fn extract(&self, audio: ReferenceAudio<'_>) -> Result<String>;
}

/// Returns the same configured transcript for every clip.
pub struct StaticExtractor {
    text: String,
}

impl StaticExtractor {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl ReferenceExtractor for StaticExtractor {
    async fn extract(&self, _audio: ReferenceAudio<'_>) -> Result<String> {
        non_empty_transcript(&self.text)
    }
}

/// Build the configured extractor.
pub fn from_settings(settings: &ExtractionSettings) -> Result<Arc<dyn ReferenceExtractor>> {
    Ok(match settings.provider {
        ExtractionProvider::Whisper => Arc::new(WhisperExtractor::new(
            &settings.model,
            std::time::Duration::from_secs(settings.timeout_secs),
        )?),
        ExtractionProvider::Static => Arc::new(StaticExtractor::new(settings.static_text.clone())),
    })
}

pub(crate) fn non_empty_transcript(text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(VoicecastError::ExtractionFailed("transcript is empty".into()));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_extractor_returns_configured_text() {
        let extractor = StaticExtractor::new("  Hello there.  ");
        let text = extractor
            .extract(ReferenceAudio::Remote("https://store.test/a.mp3"))
            .await
            .unwrap();
        assert_eq!(text, "Hello there.");
    }

    #[tokio::test]
    async fn test_blank_static_text_is_failure() {
        let extractor = StaticExtractor::new("   ");
        let err = extractor
            .extract(ReferenceAudio::Local(Path::new("clip.mp3")))
            .await
            .unwrap_err();
        assert!(matches!(err, VoicecastError::ExtractionFailed(_)));
    }

    #[test]
    fn test_from_settings_static() {
        let settings = ExtractionSettings {
            provider: ExtractionProvider::Static,
            ..ExtractionSettings::default()
        };
        assert!(from_settings(&settings).is_ok());
    }
}
