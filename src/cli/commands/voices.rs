//! Voices command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, VoicesAction};
use crate::config::Settings;
use crate::source::SourceIdentity;
use crate::voice::{ElevenLabsClient, VoiceCache};
use anyhow::Result;
use std::sync::Arc;

/// Run the voices command.
pub async fn run_voices(action: &VoicesAction, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Voices, &settings).await {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let provider = Arc::new(ElevenLabsClient::from_settings(&settings.voices)?);
    let cache = VoiceCache::new(
        provider,
        settings.voices.max_voices,
        settings.voices.strict_eviction,
    );

    match action {
        VoicesAction::List => {
            let voices = cache.list().await?;
            Output::header(&format!(
                "Cloned voices ({}/{})",
                voices.len(),
                cache.max_voices()
            ));
            if voices.is_empty() {
                Output::info("No cloned voices yet.");
            }
            for voice in &voices {
                Output::voice(voice);
            }
        }

        VoicesAction::Lookup { identity } => {
            let identity = SourceIdentity::parse(identity)?;
            match cache.lookup(&identity).await? {
                Some(voice) => Output::voice(&voice),
                None => Output::warning(&format!("No voice cloned for {}", identity)),
            }
        }
    }

    Ok(())
}
