//! Voice identities and speech synthesis providers.
//!
//! A source identity can be turned into a cloned voice at a provider
//! ([`VoiceProvider`]). The [`VoiceCache`] keeps the number of cloned voices
//! bounded. Speech is produced by a [`SpeechSynthesizer`], conditioned either
//! on a cloned voice or on a published reference clip and its transcript.

mod cache;
mod dia;
mod elevenlabs;

pub use cache::VoiceCache;
pub use dia::DiaClient;
pub use elevenlabs::ElevenLabsClient;

use crate::error::Result;
use crate::source::SourceIdentity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// A voice as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderVoice {
    pub voice_id: String,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// A cloned voice bound to a source identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceHandle {
    pub identity: SourceIdentity,
    pub provider_voice_id: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl VoiceHandle {
    fn from_provider(identity: SourceIdentity, voice: ProviderVoice) -> Self {
        Self {
            identity,
            provider_voice_id: voice.voice_id,
            created_at: voice.created_at,
        }
    }
}

/// Voice cloning capability.
///
/// `list_voices` returns only voices this application created, in the
/// provider's listing order.
#[async_trait]
pub trait VoiceProvider: Send + Sync {
    async fn list_voices(&self) -> Result<Vec<ProviderVoice>>;

    async fn create_voice(&self, name: &str, audio: &Path) -> Result<ProviderVoice>;

    async fn delete_voice(&self, voice_id: &str) -> Result<()>;
}

/// What the synthesized speech should sound like.
#[derive(Debug, Clone)]
pub enum Conditioning {
    /// A previously cloned voice.
    Voice(VoiceHandle),
    /// A public reference clip and the words spoken in it.
    Reference {
        audio_url: String,
        reference_text: String,
    },
}

#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub conditioning: Conditioning,
}

/// Encoded speech returned by a synthesizer.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    /// File extension matching the encoding, e.g. `mp3`.
    pub extension: String,
}

/// Text to speech capability.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio>;
}
