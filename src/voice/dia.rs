//! Dia TTS voice cloning on fal.ai.
//!
//! The endpoint takes the target text, a public reference clip URL and the
//! transcript of that clip, and answers with a URL to the generated audio.

use super::{Conditioning, SpeechSynthesizer, SynthesisRequest, SynthesizedAudio};
use crate::config::SynthesisSettings;
use crate::error::{Result, VoicecastError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Dia expects dialogue with speaker tags.
const SPEAKER_TAG: &str = "[S1]";

#[derive(Debug, Serialize)]
struct VoiceCloneRequest<'a> {
    text: String,
    ref_audio_url: &'a str,
    ref_text: String,
}

#[derive(Debug, Deserialize)]
struct VoiceCloneResponse {
    audio: GeneratedFile,
}

#[derive(Debug, Deserialize)]
struct GeneratedFile {
    url: String,
    #[serde(default)]
    content_type: Option<String>,
}

/// fal.ai Dia client.
pub struct DiaClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl DiaClient {
    pub fn from_settings(settings: &SynthesisSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| VoicecastError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: settings.dia_url.clone(),
            api_key: settings.dia_api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    async fn download(&self, file: &GeneratedFile) -> Result<SynthesizedAudio> {
        debug!("Downloading generated audio from: {}", file.url);

        let response = self
            .http
            .get(&file.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| VoicecastError::SynthesisFailed(format!("error downloading audio: {}", e)))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VoicecastError::SynthesisFailed(format!("error downloading audio: {}", e)))?;

        if bytes.is_empty() {
            return Err(VoicecastError::SynthesisFailed("generated audio is empty".into()));
        }

        Ok(SynthesizedAudio {
            bytes: bytes.to_vec(),
            extension: audio_extension(&file.url, file.content_type.as_deref()),
        })
    }
}

/// Prefix `text` with the speaker tag unless it already has one.
fn tag_speaker(text: &str) -> String {
    let text = text.trim();
    if text.starts_with("[S") {
        text.to_string()
    } else {
        format!("{} {}", SPEAKER_TAG, text)
    }
}

fn audio_extension(url: &str, content_type: Option<&str>) -> String {
    let from_content_type = content_type.and_then(|ct| match ct {
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/ogg" => Some("ogg"),
        "audio/flac" => Some("flac"),
        _ => None,
    });

    from_content_type
        .map(str::to_string)
        .or_else(|| {
            let path = url::Url::parse(url).ok()?.path().to_string();
            std::path::Path::new(&path)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
        })
        .filter(|ext| matches!(ext.as_str(), "wav" | "mp3" | "ogg" | "flac"))
        .unwrap_or_else(|| "mp3".to_string())
}

#[async_trait]
impl SpeechSynthesizer for DiaClient {
    #[instrument(skip(self, request), fields(chars = request.text.len()))]
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio> {
        let (audio_url, reference_text) = match &request.conditioning {
            Conditioning::Reference {
                audio_url,
                reference_text,
            } => (audio_url, reference_text),
            Conditioning::Voice(_) => {
                return Err(VoicecastError::SynthesisFailed(
                    "Dia synthesis needs a reference clip".into(),
                ))
            }
        };

        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| VoicecastError::SynthesisFailed("FAL_KEY not set".into()))?;

        let payload = VoiceCloneRequest {
            text: tag_speaker(&request.text),
            ref_audio_url: audio_url,
            ref_text: tag_speaker(reference_text),
        };

        info!("Sending request to Dia TTS API");
        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, format!("Key {}", api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| VoicecastError::SynthesisFailed(format!("error sending request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoicecastError::SynthesisFailed(format!(
                "API request failed with status code {}: {}",
                status,
                body.trim()
            )));
        }

        let parsed: VoiceCloneResponse = response
            .json()
            .await
            .map_err(|e| VoicecastError::SynthesisFailed(format!("error parsing response: {}", e)))?;

        self.download(&parsed.audio).await
    }
}
