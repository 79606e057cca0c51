//! Configuration settings for Voicecast.

use crate::orchestrator::SynthesisMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub media: MediaSettings,
    pub storage: StorageSettings,
    pub extraction: ExtractionSettings,
    pub voices: VoiceSettings,
    pub synthesis: SynthesisSettings,
    pub pipeline: PipelineSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory holding downloaded source audio and generated speech.
    pub data_dir: String,
    /// Directory for short-lived transformed clips.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "./downloads".to_string(),
            temp_dir: "/tmp/voicecast".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Download and transcode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    /// Maximum seconds of audio kept from a downloaded source.
    pub max_fetch_seconds: u32,
    /// Length of the reference clip sent to reference-conditioned providers.
    pub reference_clip_seconds: u32,
    /// Bitrate for the reference clip (ffmpeg syntax).
    pub bitrate: String,
    /// Sample rate for the reference clip.
    pub sample_rate: u32,
    /// Upper bound for a single yt-dlp/ffmpeg invocation.
    pub tool_timeout_secs: u64,
    /// Netscape cookies file handed to yt-dlp when present.
    pub cookies_file: Option<String>,
    /// Cookie contents from the environment; takes precedence over `cookies_file`.
    #[serde(skip)]
    pub cookies: Option<String>,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            max_fetch_seconds: 180,
            reference_clip_seconds: 15,
            bitrate: "64k".to_string(),
            sample_rate: 22050,
            tool_timeout_secs: 300,
            cookies_file: Some("cookies.txt".to_string()),
            cookies: None,
        }
    }
}

/// S3-compatible object storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Endpoint including scheme, e.g. `https://minio.example.com`.
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub region: String,
    #[serde(skip_serializing)]
    pub access_key: Option<String>,
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
    /// Key prefix for uploaded clips.
    pub prefix: String,
    /// Public base URL for uploaded objects, if it differs from `{endpoint}/{bucket}`.
    pub public_base_url: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            bucket: None,
            region: "us-east-1".to_string(),
            access_key: None,
            secret_key: None,
            prefix: "audio".to_string(),
            public_base_url: None,
        }
    }
}

/// Reference extractor provider.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionProvider {
    /// OpenAI speech-to-text.
    #[default]
    Whisper,
    /// Fixed placeholder transcript.
    Static,
}

impl std::str::FromStr for ExtractionProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "whisper" | "openai" => Ok(ExtractionProvider::Whisper),
            "static" => Ok(ExtractionProvider::Static),
            _ => Err(format!("Unknown extraction provider: {}", s)),
        }
    }
}

impl std::fmt::Display for ExtractionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionProvider::Whisper => write!(f, "whisper"),
            ExtractionProvider::Static => write!(f, "static"),
        }
    }
}

/// Reference text extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub provider: ExtractionProvider,
    /// Transcription model for the whisper provider.
    pub model: String,
    /// Transcript returned by the static provider.
    pub static_text: String,
    pub timeout_secs: u64,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            provider: ExtractionProvider::Whisper,
            model: "whisper-1".to_string(),
            static_text: "This is sample reference text extracted from the audio.".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Voice cloning provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Maximum number of cloned voices kept at the provider.
    pub max_voices: usize,
    /// Label attached to every voice this application creates.
    pub app_label: String,
    /// Abort a clone when evicting an old voice fails.
    pub strict_eviction: bool,
    pub model_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
    pub timeout_secs: u64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io/v1".to_string(),
            api_key: None,
            max_voices: 10,
            app_label: "voicecast".to_string(),
            strict_eviction: true,
            model_id: "eleven_monolingual_v1".to_string(),
            stability: 0.5,
            similarity_boost: 0.5,
            timeout_secs: 120,
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    pub default_mode: SynthesisMode,
    /// Reference-conditioned voice clone endpoint.
    pub dia_url: String,
    #[serde(skip_serializing)]
    pub dia_api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            default_mode: SynthesisMode::Reference,
            dia_url: "https://fal.run/fal-ai/dia-tts/voice-clone".to_string(),
            dia_api_key: None,
            timeout_secs: 300,
        }
    }
}

/// Per-request limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Upper bound for any single pipeline stage.
    pub stage_timeout_secs: u64,
    pub max_text_chars: usize,
    pub max_upload_bytes: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            stage_timeout_secs: 600,
            max_text_chars: 500,
            max_upload_bytes: 50 << 20,
        }
    }
}

impl PipelineSettings {
    /// Stage timeout, never shorter than one second.
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs.max(1))
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Secrets are overlaid from the environment afterwards.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Overlay secrets and storage coordinates from environment variables.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("S3_ENDPOINT") {
            self.storage.endpoint = Some(v);
        }
        if let Some(v) = non_empty("S3_BUCKET") {
            self.storage.bucket = Some(v);
        }
        if let Some(v) = non_empty("S3_ACCESS_KEY") {
            self.storage.access_key = Some(v);
        }
        if let Some(v) = non_empty("S3_SECRET_KEY") {
            self.storage.secret_key = Some(v);
        }
        if let Some(v) = non_empty("ELEVENLABS_API_KEY") {
            self.voices.api_key = Some(v);
        }
        if let Some(v) = non_empty("FAL_KEY") {
            self.synthesis.dia_api_key = Some(v);
        }
        if let Some(v) = non_empty("YOUTUBE_COOKIES") {
            self.media.cookies = Some(v);
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voicecast")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded cookies file path, if configured.
    pub fn cookies_file(&self) -> Option<PathBuf> {
        self.media.cookies_file.as_deref().map(Self::expand_path)
    }
}
