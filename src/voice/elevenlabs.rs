//! ElevenLabs voice cloning and text to speech.

use super::{
    Conditioning, ProviderVoice, SpeechSynthesizer, SynthesisRequest, SynthesizedAudio,
    VoiceProvider,
};
use crate::config::VoiceSettings;
use crate::error::{Result, VoicecastError};
use crate::source::content_type_for;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Label key used to tag voices created by this application.
const APP_LABEL_KEY: &str = "app";

/// Category of voices created through instant voice cloning.
const CLONED_CATEGORY: &str = "cloned";

#[derive(Debug, Deserialize)]
struct VoiceList {
    #[serde(default)]
    voices: Vec<VoiceEntry>,
}

#[derive(Debug, Deserialize)]
struct VoiceEntry {
    voice_id: String,
    name: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    labels: HashMap<String, String>,
    #[serde(default)]
    created_at_unix: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CreatedVoice {
    voice_id: String,
}

#[derive(Debug, Serialize)]
struct TextToSpeech<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceTuning,
}

#[derive(Debug, Serialize)]
struct VoiceTuning {
    stability: f32,
    similarity_boost: f32,
}

/// ElevenLabs REST client.
pub struct ElevenLabsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    app_label: String,
    model_id: String,
    stability: f32,
    similarity_boost: f32,
}

impl ElevenLabsClient {
    pub fn from_settings(settings: &VoiceSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| VoicecastError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            app_label: settings.app_label.clone(),
            model_id: settings.model_id.clone(),
            stability: settings.stability,
            similarity_boost: settings.similarity_boost,
        })
    }

    fn api_key(&self, fail: fn(String) -> VoicecastError) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| fail("ELEVENLABS_API_KEY not set".into()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Whether a listed voice belongs to this application.
    fn is_own_voice(&self, entry: &VoiceEntry) -> bool {
        entry.category.as_deref() == Some(CLONED_CATEGORY)
            && entry.labels.get(APP_LABEL_KEY) == Some(&self.app_label)
    }
}

/// Turn a failed response into an error carrying the provider's message.
async fn check_status(
    response: reqwest::Response,
    what: &str,
    fail: fn(String) -> VoicecastError,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(fail(format!("{} returned {}: {}", what, status, body.trim())))
}

#[async_trait]
impl VoiceProvider for ElevenLabsClient {
    async fn list_voices(&self) -> Result<Vec<ProviderVoice>> {
        let fail = VoicecastError::VoiceListing;
        let response = self
            .http
            .get(self.url("voices"))
            .header("xi-api-key", self.api_key(fail)?)
            .send()
            .await
            .map_err(|e| fail(format!("failed to list voices: {}", e)))?;

        let list: VoiceList = check_status(response, "voice listing", fail)
            .await?
            .json()
            .await
            .map_err(|e| fail(format!("invalid voice listing: {}", e)))?;

        let voices: Vec<ProviderVoice> = list
            .voices
            .into_iter()
            .filter(|entry| self.is_own_voice(entry))
            .map(|entry| ProviderVoice {
                voice_id: entry.voice_id,
                name: entry.name,
                created_at: entry
                    .created_at_unix
                    .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            })
            .collect();

        debug!("Provider lists {} cloned voices", voices.len());
        Ok(voices)
    }

    #[instrument(skip(self, audio))]
    async fn create_voice(&self, name: &str, audio: &Path) -> Result<ProviderVoice> {
        let fail = VoicecastError::CloneFailed;
        let bytes = tokio::fs::read(audio)
            .await
            .map_err(|e| fail(format!("cannot read {}: {}", audio.display(), e)))?;

        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();
        let extension = audio.extension().and_then(|e| e.to_str()).unwrap_or("mp3");

        let file = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type_for(extension))
            .map_err(|e| fail(format!("invalid audio part: {}", e)))?;

        let labels = serde_json::to_string(&HashMap::from([(APP_LABEL_KEY, self.app_label.as_str())]))?;

        let form = Form::new()
            .text("name", name.to_string())
            .text("labels", labels)
            .part("files", file);

        let response = self
            .http
            .post(self.url("voices/add"))
            .header("xi-api-key", self.api_key(fail)?)
            .multipart(form)
            .send()
            .await
            .map_err(|e| fail(format!("failed to create voice: {}", e)))?;

        let created: CreatedVoice = check_status(response, "voice creation", fail)
            .await?
            .json()
            .await
            .map_err(|e| fail(format!("invalid voice creation response: {}", e)))?;

        info!("Created voice {} for {}", created.voice_id, name);
        Ok(ProviderVoice {
            voice_id: created.voice_id,
            name: name.to_string(),
            created_at: Some(Utc::now()),
        })
    }

    #[instrument(skip(self))]
    async fn delete_voice(&self, voice_id: &str) -> Result<()> {
        let fail = VoicecastError::CloneFailed;
        let response = self
            .http
            .delete(self.url(&format!("voices/{}", voice_id)))
            .header("xi-api-key", self.api_key(fail)?)
            .send()
            .await
            .map_err(|e| fail(format!("failed to delete voice {}: {}", voice_id, e)))?;

        check_status(response, "voice deletion", fail).await?;
        info!("Deleted voice {}", voice_id);
        Ok(())
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    #[instrument(skip(self, request), fields(chars = request.text.len()))]
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio> {
        let fail = VoicecastError::SynthesisFailed;
        let voice = match &request.conditioning {
            Conditioning::Voice(handle) => handle,
            Conditioning::Reference { .. } => {
                return Err(fail("ElevenLabs synthesis needs a cloned voice".into()))
            }
        };

        let body = TextToSpeech {
            text: &request.text,
            model_id: &self.model_id,
            voice_settings: VoiceTuning {
                stability: self.stability,
                similarity_boost: self.similarity_boost,
            },
        };

        let response = self
            .http
            .post(self.url(&format!("text-to-speech/{}", voice.provider_voice_id)))
            .header("xi-api-key", self.api_key(fail)?)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| fail(format!("text to speech request failed: {}", e)))?;

        let bytes = check_status(response, "text to speech", fail)
            .await?
            .bytes()
            .await
            .map_err(|e| fail(format!("failed to read speech audio: {}", e)))?;

        if bytes.is_empty() {
            return Err(fail("provider returned no audio".into()));
        }

        Ok(SynthesizedAudio {
            bytes: bytes.to_vec(),
            extension: "mp3".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ElevenLabsClient {
        ElevenLabsClient::from_settings(&VoiceSettings::default()).unwrap()
    }

    fn entry(category: &str, app: Option<&str>) -> VoiceEntry {
        VoiceEntry {
            voice_id: "v1".into(),
            name: "abcdefghijk".into(),
            category: Some(category.into()),
            labels: app
                .map(|a| HashMap::from([(APP_LABEL_KEY.to_string(), a.to_string())]))
                .unwrap_or_default(),
            created_at_unix: None,
        }
    }

    #[test]
    fn test_only_own_cloned_voices_count() {
        let client = client();
        assert!(client.is_own_voice(&entry("cloned", Some("voicecast"))));
        assert!(!client.is_own_voice(&entry("premade", Some("voicecast"))));
        assert!(!client.is_own_voice(&entry("cloned", Some("other-app"))));
        assert!(!client.is_own_voice(&entry("cloned", None)));
    }

    #[test]
    fn test_voice_listing_parses() {
        let json = r#"{"voices":[{"voice_id":"abc","name":"dQw4w9WgXcQ","category":"cloned",
            "labels":{"app":"voicecast"},"created_at_unix":1700000000}]}"#;
        let list: VoiceList = serde_json::from_str(json).unwrap();
        assert_eq!(list.voices.len(), 1);
        assert_eq!(list.voices[0].created_at_unix, Some(1_700_000_000));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_request() {
        let err = client().list_voices().await.unwrap_err();
        assert!(matches!(err, VoicecastError::VoiceListing(msg) if msg.contains("ELEVENLABS_API_KEY")));
    }

    #[tokio::test]
    async fn test_unreadable_audio_fails_clone() {
        let err = client()
            .create_voice("abcdefghijk", Path::new("/nonexistent.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, VoicecastError::CloneFailed(_)));
    }
}
