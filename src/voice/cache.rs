//! Bounded identity → cloned voice cache.

use super::{VoiceHandle, VoiceProvider};
use crate::error::{Result, VoicecastError};
use crate::locks::KeyedLocks;
use crate::source::SourceIdentity;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// Maps source identities to provider voices, keeping at most `max_voices`.
///
/// The provider's voice list is the cache contents: a voice named after the
/// identity is a hit. On a miss at capacity the oldest voices in listing
/// order are deleted before the new one is cloned.
pub struct VoiceCache {
    provider: Arc<dyn VoiceProvider>,
    max_voices: usize,
    strict_eviction: bool,
    identity_locks: KeyedLocks,
    // Serializes evict-then-create across identities
    capacity: Mutex<()>,
}

impl VoiceCache {
    pub fn new(provider: Arc<dyn VoiceProvider>, max_voices: usize, strict_eviction: bool) -> Self {
        Self {
            provider,
            max_voices: max_voices.max(1),
            strict_eviction,
            identity_locks: KeyedLocks::new(),
            capacity: Mutex::new(()),
        }
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices
    }

    /// All cached voices whose names are valid identities, in listing order.
    pub async fn list(&self) -> Result<Vec<VoiceHandle>> {
        Ok(self
            .provider
            .list_voices()
            .await?
            .into_iter()
            .filter_map(|voice| {
                let identity = SourceIdentity::parse(&voice.name).ok()?;
                Some(VoiceHandle::from_provider(identity, voice))
            })
            .collect())
    }

    /// The voice cloned for `identity`, if any.
    pub async fn lookup(&self, identity: &SourceIdentity) -> Result<Option<VoiceHandle>> {
        Ok(self
            .provider
            .list_voices()
            .await?
            .into_iter()
            .find(|voice| voice.name == identity.as_str())
            .map(|voice| VoiceHandle::from_provider(identity.clone(), voice)))
    }

    /// Return the voice for `identity`, cloning it from `raw_audio` on a miss.
    #[instrument(skip(self, raw_audio), fields(identity = %identity))]
    pub async fn get_or_create(&self, identity: &SourceIdentity, raw_audio: &Path) -> Result<VoiceHandle> {
        let _identity_guard = self.identity_locks.lock(identity.as_str()).await;

        if let Some(handle) = self.lookup(identity).await.map_err(as_clone_failure)? {
            info!("Using existing voice {}", handle.provider_voice_id);
            return Ok(handle);
        }

        let _capacity_guard = self.capacity.lock().await;

        // The count may have changed while another identity held the capacity lock
        let voices = self.provider.list_voices().await.map_err(as_clone_failure)?;
        if voices.len() >= self.max_voices {
            let excess = voices.len() - self.max_voices + 1;
            for victim in voices.iter().take(excess) {
                info!("Evicting voice {} ({})", victim.voice_id, victim.name);
                if let Err(e) = self.provider.delete_voice(&victim.voice_id).await {
                    if self.strict_eviction {
                        return Err(VoicecastError::CloneFailed(format!(
                            "could not evict voice {}: {}",
                            victim.voice_id, e
                        )));
                    }
                    warn!("Failed to evict voice {}: {}", victim.voice_id, e);
                }
            }
        }

        let created = self.provider.create_voice(identity.as_str(), raw_audio).await?;
        info!("Cloned voice {}", created.voice_id);
        Ok(VoiceHandle::from_provider(identity.clone(), created))
    }
}

/// Listing is part of cloning here, so its failures report as clone failures.
fn as_clone_failure(e: VoicecastError) -> VoicecastError {
    match e {
        VoicecastError::VoiceListing(msg) => VoicecastError::CloneFailed(msg),
        other => other,
    }
}
