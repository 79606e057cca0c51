//! OpenAI Whisper reference extraction.

use super::{non_empty_transcript, ReferenceAudio, ReferenceExtractor};
use crate::error::{Result, VoicecastError};
use crate::openai::create_client_with_timeout;
use async_openai::types::{AudioInput, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Transcribes reference clips with the OpenAI transcription API.
pub struct WhisperExtractor {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    http: reqwest::Client,
    model: String,
}

impl WhisperExtractor {
    pub fn new(model: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VoicecastError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            http,
            model: model.to_string(),
        })
    }

    async fn read_audio(&self, audio: ReferenceAudio<'_>) -> Result<(String, Vec<u8>)> {
        match audio {
            ReferenceAudio::Local(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    VoicecastError::ExtractionFailed(format!("cannot read {}: {}", path.display(), e))
                })?;
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("reference.mp3")
                    .to_string();
                Ok((name, bytes))
            }
            ReferenceAudio::Remote(url) => {
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| {
                        VoicecastError::ExtractionFailed(format!("failed to fetch reference audio: {}", e))
                    })?;
                let bytes = response.bytes().await.map_err(|e| {
                    VoicecastError::ExtractionFailed(format!("failed to read reference audio: {}", e))
                })?;
                Ok((file_name_from_url(url), bytes.to_vec()))
            }
        }
    }
}

fn file_name_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "reference.mp3".to_string())
}

#[async_trait]
impl ReferenceExtractor for WhisperExtractor {
    #[instrument(skip(self, audio))]
    async fn extract(&self, audio: ReferenceAudio<'_>) -> Result<String> {
        let (file_name, bytes) = self.read_audio(audio).await?;
        debug!("Transcribing reference clip {} ({} bytes)", file_name, bytes.len());

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(file_name, bytes))
            .model(&self.model)
            .build()
            .map_err(|e| VoicecastError::ExtractionFailed(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| VoicecastError::ExtractionFailed(format!("Whisper API error: {}", e)))?;

        non_empty_transcript(&response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://store.test/audio/1700000000000_abc_compressed.mp3"),
            "1700000000000_abc_compressed.mp3"
        );
        assert_eq!(file_name_from_url("https://store.test/"), "reference.mp3");
        assert_eq!(file_name_from_url("not a url"), "reference.mp3");
    }

    #[tokio::test]
    async fn test_missing_local_file_is_extraction_failure() {
        let extractor = WhisperExtractor::new("whisper-1", Duration::from_secs(5)).unwrap();
        let err = extractor
            .extract(ReferenceAudio::Local(std::path::Path::new("/nonexistent/clip.mp3")))
            .await
            .unwrap_err();
        assert!(matches!(err, VoicecastError::ExtractionFailed(_)));
    }
}
