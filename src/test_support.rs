//! In-memory fakes of the external capabilities.

use crate::error::{Result, VoicecastError};
use crate::extraction::{ReferenceAudio, ReferenceExtractor};
use crate::media::{MediaFetcher, TranscodeProfile, Transcoder};
use crate::publish::ObjectStore;
use crate::voice::{
    Conditioning, ProviderVoice, SpeechSynthesizer, SynthesisRequest, SynthesizedAudio,
    VoiceProvider,
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub enum FetchBehavior {
    Succeed,
    SlowSucceed,
    FailAfterPartialWrite,
    SucceedWithoutFile,
    ToolMissing,
    /// Writes partial output, then never finishes.
    Hang,
}

pub struct FakeFetcher {
    behavior: FetchBehavior,
    calls: AtomicUsize,
    last_max_duration: Mutex<Option<u32>>,
}

impl FakeFetcher {
    pub fn new(behavior: FetchBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            last_max_duration: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_max_duration(&self) -> Option<u32> {
        *self.last_max_duration.lock().unwrap()
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch(&self, _reference: &str, output_path: &Path, max_duration_seconds: u32) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_max_duration.lock().unwrap() = Some(max_duration_seconds);

        match self.behavior {
            FetchBehavior::Succeed => {
                tokio::fs::write(output_path, b"ID3fake").await?;
                Ok(())
            }
            FetchBehavior::SlowSucceed => {
                tokio::time::sleep(Duration::from_millis(50)).await;
                tokio::fs::write(output_path, b"ID3fake").await?;
                Ok(())
            }
            FetchBehavior::FailAfterPartialWrite => {
                tokio::fs::write(output_path, b"ID3").await?;
                tokio::fs::write(output_path.with_extension("webm.part"), b"partial").await?;
                Err(VoicecastError::AcquisitionFailed("connection reset".into()))
            }
            FetchBehavior::SucceedWithoutFile => Ok(()),
            FetchBehavior::ToolMissing => Err(VoicecastError::ToolUnavailable("yt-dlp".into())),
            FetchBehavior::Hang => {
                tokio::fs::write(output_path, b"ID3").await?;
                tokio::fs::write(output_path.with_extension("webm.part"), b"partial").await?;
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum TranscodeBehavior {
    Copy,
    WriteEmpty,
    Fail,
    /// Writes the output, then never finishes.
    Hang,
}

pub struct FakeTranscoder {
    behavior: TranscodeBehavior,
    calls: AtomicUsize,
    last_profile: Mutex<Option<TranscodeProfile>>,
}

impl FakeTranscoder {
    pub fn new(behavior: TranscodeBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            last_profile: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_profile(&self) -> Option<TranscodeProfile> {
        self.last_profile.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(&self, input: &Path, output: &Path, profile: &TranscodeProfile) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_profile.lock().unwrap() = Some(profile.clone());

        match self.behavior {
            TranscodeBehavior::Copy => {
                tokio::fs::copy(input, output).await?;
                Ok(())
            }
            TranscodeBehavior::WriteEmpty => {
                tokio::fs::write(output, b"").await?;
                Ok(())
            }
            TranscodeBehavior::Fail => {
                Err(VoicecastError::TransformFailed("ffmpeg failed (exit status: 1)".into()))
            }
            TranscodeBehavior::Hang => {
                tokio::fs::copy(input, output).await?;
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            }
        }
    }
}

pub struct FakeStore {
    fail: bool,
    calls: AtomicUsize,
}

impl FakeStore {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn put_object(&self, key: &str, _local_path: &Path, _content_type: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(VoicecastError::PublishFailed("S3 upload returned status 503".into()));
        }
        Ok(format!("https://store.test/{}", key))
    }
}

pub struct FakeExtractor {
    text: String,
    calls: AtomicUsize,
}

impl FakeExtractor {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReferenceExtractor for FakeExtractor {
    async fn extract(&self, _audio: ReferenceAudio<'_>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        crate::extraction::non_empty_transcript(&self.text)
    }
}

pub struct FakeVoiceProvider {
    voices: Mutex<Vec<ProviderVoice>>,
    next_id: AtomicUsize,
    creates: AtomicUsize,
    deletes: AtomicUsize,
    create_delay: Duration,
    fail_creates: bool,
    fail_deletes: bool,
    fail_lists: bool,
}

impl FakeVoiceProvider {
    pub fn new() -> Self {
        Self {
            voices: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            create_delay: Duration::ZERO,
            fail_creates: false,
            fail_deletes: false,
            fail_lists: false,
        }
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    pub fn failing_creates(mut self) -> Self {
        self.fail_creates = true;
        self
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn failing_lists(mut self) -> Self {
        self.fail_lists = true;
        self
    }

    /// Add a voice without counting it as a create.
    pub fn seed(&self, name: &str) {
        let voice = self.new_voice(name);
        self.voices.lock().unwrap().push(voice);
    }

    fn new_voice(&self, name: &str) -> ProviderVoice {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        ProviderVoice {
            voice_id: format!("voice_{}", n),
            name: name.to_string(),
            created_at: Some(chrono::Utc::now()),
        }
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.voices.lock().unwrap().len()
    }

    pub fn names(&self) -> Vec<String> {
        self.voices.lock().unwrap().iter().map(|v| v.name.clone()).collect()
    }
}

#[async_trait]
impl VoiceProvider for FakeVoiceProvider {
    async fn list_voices(&self) -> Result<Vec<ProviderVoice>> {
        if self.fail_lists {
            return Err(VoicecastError::VoiceListing("voice listing returned 503".into()));
        }
        Ok(self.voices.lock().unwrap().clone())
    }

    async fn create_voice(&self, name: &str, _audio: &Path) -> Result<ProviderVoice> {
        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }
        if self.fail_creates {
            return Err(VoicecastError::CloneFailed("voice creation returned 422".into()));
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        let voice = self.new_voice(name);
        self.voices.lock().unwrap().push(voice.clone());
        Ok(voice)
    }

    async fn delete_voice(&self, voice_id: &str) -> Result<()> {
        if self.fail_deletes {
            return Err(VoicecastError::CloneFailed("voice deletion returned 500".into()));
        }
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.voices.lock().unwrap().retain(|v| v.voice_id != voice_id);
        Ok(())
    }
}

pub struct FakeSynthesizer {
    calls: AtomicUsize,
    last_conditioning: Mutex<Option<Conditioning>>,
    fail: bool,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            last_conditioning: Mutex::new(None),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_conditioning(&self) -> Option<Conditioning> {
        self.last_conditioning.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_conditioning.lock().unwrap() = Some(request.conditioning.clone());
        if self.fail {
            return Err(VoicecastError::SynthesisFailed("provider returned no audio".into()));
        }
        Ok(SynthesizedAudio {
            bytes: format!("speech:{}", request.text).into_bytes(),
            extension: "mp3".into(),
        })
    }
}
