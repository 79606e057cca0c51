//! Pipeline orchestrator for Voicecast.
//!
//! Sequences resolution, acquisition, reference preparation or voice cloning,
//! synthesis and persistence for one request. Each stage runs under a timeout
//! and a failure is reported together with the stage it happened in.

use crate::config::Settings;
use crate::error::{PipelineFailure, Result, Stage, VoicecastError};
use crate::extraction::{self, ReferenceAudio, ReferenceExtractor};
use crate::media::{
    AudioTransformer, CookieSource, FfmpegTranscoder, LocalArtifact, MediaAcquirer, MediaFetcher,
    Transcoder, YtDlpFetcher,
};
use crate::publish::Publisher;
use crate::source::{Resolver, SourceIdentity, SourceReference};
use crate::voice::{
    Conditioning, DiaClient, ElevenLabsClient, SpeechSynthesizer, SynthesisRequest,
    SynthesizedAudio, VoiceCache, VoiceProvider,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// How the synthesized speech is conditioned on the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisMode {
    /// Publish a short reference clip and synthesize against it.
    #[default]
    Reference,
    /// Clone a persistent voice for the source and synthesize with it.
    Identity,
}

impl std::str::FromStr for SynthesisMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reference" => Ok(SynthesisMode::Reference),
            "identity" => Ok(SynthesisMode::Identity),
            _ => Err(format!("Unknown synthesis mode: {}. Use 'reference' or 'identity'.", s)),
        }
    }
}

impl std::fmt::Display for SynthesisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthesisMode::Reference => write!(f, "reference"),
            SynthesisMode::Identity => write!(f, "identity"),
        }
    }
}

/// One synthesis job.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub reference: SourceReference,
    pub text: String,
    pub mode: SynthesisMode,
}

/// Speech written to the output directory.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedSpeech {
    pub identity: SourceIdentity,
    pub path: PathBuf,
    pub file_name: String,
}

/// A published reference clip with its transcript, reusable across texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedReference {
    pub identity: SourceIdentity,
    pub audio_url: String,
    pub reference_text: String,
}

/// External capabilities the pipeline runs on.
pub struct Components {
    pub fetcher: Arc<dyn MediaFetcher>,
    pub transcoder: Arc<dyn Transcoder>,
    pub publisher: Publisher,
    pub extractor: Arc<dyn ReferenceExtractor>,
    pub voice_provider: Arc<dyn VoiceProvider>,
    pub voice_synthesizer: Arc<dyn SpeechSynthesizer>,
    pub reference_synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl Components {
    /// Production clients built from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let tool_timeout = Duration::from_secs(settings.media.tool_timeout_secs);
        let cookies = CookieSource::resolve(settings.media.cookies.clone(), settings.cookies_file());
        let elevenlabs = Arc::new(ElevenLabsClient::from_settings(&settings.voices)?);

        Ok(Self {
            fetcher: Arc::new(YtDlpFetcher::new(tool_timeout, cookies)),
            transcoder: Arc::new(FfmpegTranscoder::new(tool_timeout)),
            publisher: Publisher::from_settings(&settings.storage),
            extractor: extraction::from_settings(&settings.extraction)?,
            voice_provider: elevenlabs.clone(),
            voice_synthesizer: elevenlabs,
            reference_synthesizer: Arc::new(DiaClient::from_settings(&settings.synthesis)?),
        })
    }
}

/// The main orchestrator for the Voicecast pipeline.
pub struct Orchestrator {
    settings: Settings,
    resolver: Resolver,
    acquirer: MediaAcquirer,
    transformer: AudioTransformer,
    publisher: Publisher,
    extractor: Arc<dyn ReferenceExtractor>,
    voice_cache: VoiceCache,
    voice_synthesizer: Arc<dyn SpeechSynthesizer>,
    reference_synthesizer: Arc<dyn SpeechSynthesizer>,
    output_dir: PathBuf,
    stage_timeout: Duration,
}

impl Orchestrator {
    /// Create a new orchestrator with the production clients.
    pub fn new(settings: Settings) -> Result<Self> {
        let components = Components::from_settings(&settings)?;
        Self::with_components(settings, components)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(settings: Settings, components: Components) -> Result<Self> {
        let output_dir = settings.data_dir();
        let temp_dir = settings.temp_dir();
        std::fs::create_dir_all(&output_dir)?;
        std::fs::create_dir_all(&temp_dir)?;

        let acquirer = MediaAcquirer::new(
            output_dir.clone(),
            components.fetcher,
            settings.media.max_fetch_seconds,
        );
        let transformer = AudioTransformer::new(
            components.transcoder,
            temp_dir,
            settings.media.bitrate.clone(),
            settings.media.sample_rate,
        );
        let voice_cache = VoiceCache::new(
            components.voice_provider,
            settings.voices.max_voices,
            settings.voices.strict_eviction,
        );

        Ok(Self {
            stage_timeout: settings.pipeline.stage_timeout(),
            resolver: Resolver::new(),
            acquirer,
            transformer,
            publisher: components.publisher,
            extractor: components.extractor,
            voice_cache,
            voice_synthesizer: components.voice_synthesizer,
            reference_synthesizer: components.reference_synthesizer,
            output_dir,
            settings,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Directory holding raw source audio and generated speech.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn voice_cache(&self) -> &VoiceCache {
        &self.voice_cache
    }

    /// Run the whole pipeline for one job.
    #[instrument(skip(self, request), fields(source = %request.reference.describe(), mode = %request.mode))]
    pub async fn generate(
        &self,
        request: GenerateRequest,
    ) -> std::result::Result<GeneratedSpeech, PipelineFailure> {
        let text = self
            .validate_text(&request.text)
            .map_err(|e| PipelineFailure::new(Stage::Resolving, e))?;

        let identity = self
            .stage(Stage::Resolving, async { self.resolver.resolve(&request.reference) })
            .await?;
        info!("Resolved source identity {}", identity);

        let raw = self
            .stage(Stage::Acquiring, self.acquirer.acquire(&identity, &request.reference))
            .await?;

        let (conditioning, synthesizer) = match request.mode {
            SynthesisMode::Reference => {
                let prepared = self.prepare_from_raw(&raw).await?;
                (
                    Conditioning::Reference {
                        audio_url: prepared.audio_url,
                        reference_text: prepared.reference_text,
                    },
                    &self.reference_synthesizer,
                )
            }
            SynthesisMode::Identity => {
                let handle = self
                    .stage(Stage::Cloning, self.voice_cache.get_or_create(&identity, &raw.path))
                    .await?;
                (Conditioning::Voice(handle), &self.voice_synthesizer)
            }
        };

        self.synthesize_and_persist(&identity, synthesizer.as_ref(), text, conditioning)
            .await
    }

    /// Resolve, acquire and publish a reference clip with its transcript.
    #[instrument(skip(self, reference), fields(source = %reference.describe()))]
    pub async fn prepare_reference(
        &self,
        reference: &SourceReference,
    ) -> std::result::Result<PreparedReference, PipelineFailure> {
        let identity = self
            .stage(Stage::Resolving, async { self.resolver.resolve(reference) })
            .await?;
        let raw = self
            .stage(Stage::Acquiring, self.acquirer.acquire(&identity, reference))
            .await?;
        self.prepare_from_raw(&raw).await
    }

    /// Synthesize `text` against a reference prepared earlier.
    #[instrument(skip(self, prepared, text), fields(identity = %prepared.identity))]
    pub async fn synthesize_prepared(
        &self,
        prepared: &PreparedReference,
        text: &str,
    ) -> std::result::Result<GeneratedSpeech, PipelineFailure> {
        let text = self
            .validate_text(text)
            .map_err(|e| PipelineFailure::new(Stage::Resolving, e))?;

        let conditioning = Conditioning::Reference {
            audio_url: prepared.audio_url.clone(),
            reference_text: prepared.reference_text.clone(),
        };

        self.synthesize_and_persist(
            &prepared.identity,
            self.reference_synthesizer.as_ref(),
            text,
            conditioning,
        )
        .await
    }

    fn validate_text(&self, text: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(VoicecastError::InvalidInput("Text is required".into()));
        }
        let chars = text.chars().count();
        if chars > self.settings.pipeline.max_text_chars {
            return Err(VoicecastError::InvalidInput(format!(
                "Text is {} characters, limit is {}",
                chars, self.settings.pipeline.max_text_chars
            )));
        }
        Ok(text.to_string())
    }

    /// Transform, publish and extract. The clip is deleted whatever the outcome,
    /// including when this future is dropped.
    async fn prepare_from_raw(
        &self,
        raw: &LocalArtifact,
    ) -> std::result::Result<PreparedReference, PipelineFailure> {
        let clip = self
            .stage(
                Stage::Transforming,
                self.transformer
                    .transform(raw, self.settings.media.reference_clip_seconds),
            )
            .await?;

        let result = async {
            let remote = self
                .stage(Stage::Publishing, self.publisher.publish(&clip.artifact))
                .await?;
            let reference_text = self
                .stage(
                    Stage::Extracting,
                    self.extractor.extract(ReferenceAudio::Local(&clip.artifact.path)),
                )
                .await?;
            Ok::<_, PipelineFailure>(PreparedReference {
                identity: raw.identity.clone(),
                audio_url: remote.url,
                reference_text,
            })
        }
        .await;

        clip.close();
        result
    }

    async fn synthesize_and_persist(
        &self,
        identity: &SourceIdentity,
        synthesizer: &dyn SpeechSynthesizer,
        text: String,
        conditioning: Conditioning,
    ) -> std::result::Result<GeneratedSpeech, PipelineFailure> {
        let request = SynthesisRequest { text, conditioning };
        let audio = self
            .stage(Stage::Synthesizing, synthesizer.synthesize(&request))
            .await?;

        let speech = self
            .stage(Stage::Persisting, self.persist(identity, audio))
            .await?;
        info!("Generated speech saved to {}", speech.path.display());
        Ok(speech)
    }

    /// Write the audio under a fresh unique name. Bytes go to a staging file
    /// first, so the final path only ever holds complete audio.
    async fn persist(&self, identity: &SourceIdentity, audio: SynthesizedAudio) -> Result<GeneratedSpeech> {
        if audio.bytes.is_empty() {
            return Err(VoicecastError::PersistFailed("no audio to save".into()));
        }

        let file_name = format!(
            "{}_speech_{}.{}",
            identity,
            uuid::Uuid::new_v4().simple(),
            audio.extension
        );
        let path = self.output_dir.join(&file_name);

        let staging = tempfile::Builder::new()
            .prefix(".speech-")
            .tempfile_in(&self.output_dir)
            .map_err(|e| VoicecastError::PersistFailed(e.to_string()))?;

        tokio::fs::write(staging.path(), &audio.bytes)
            .await
            .map_err(|e| VoicecastError::PersistFailed(e.to_string()))?;

        staging
            .persist_noclobber(&path)
            .map_err(|e| VoicecastError::PersistFailed(e.error.to_string()))?;

        Ok(GeneratedSpeech {
            identity: identity.clone(),
            path,
            file_name,
        })
    }

    /// Run one stage under the stage timeout, tagging failures with the stage.
    async fn stage<T, F>(&self, stage: Stage, fut: F) -> std::result::Result<T, PipelineFailure>
    where
        F: Future<Output = Result<T>>,
    {
        debug!("Entering stage {}", stage);
        match tokio::time::timeout(self.stage_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(PipelineFailure::new(stage, e)),
            Err(_) => Err(PipelineFailure::new(
                stage,
                VoicecastError::Timeout(self.stage_timeout.as_secs()),
            )),
        }
    }
}
