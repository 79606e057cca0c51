//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{ExtractionProvider, Settings};
use crate::error::{Result, VoicecastError};
use crate::media::check_tool;
use crate::orchestrator::SynthesisMode;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Synthesis; `fetch` is set when the source is a URL.
    Generate { mode: SynthesisMode, fetch: bool },
    /// Publishing a reference clip from a URL.
    Prepare,
    /// Listing or looking up cloned voices.
    Voices,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub async fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Generate { mode, fetch } => {
            if fetch {
                check_tool("yt-dlp").await?;
            }
            match mode {
                SynthesisMode::Reference => {
                    check_reference_pipeline(settings).await?;
                    require(settings.synthesis.dia_api_key.as_deref(), "FAL_KEY")?;
                }
                SynthesisMode::Identity => {
                    require(settings.voices.api_key.as_deref(), "ELEVENLABS_API_KEY")?;
                }
            }
        }
        Operation::Prepare => {
            check_tool("yt-dlp").await?;
            check_reference_pipeline(settings).await?;
        }
        Operation::Voices => {
            require(settings.voices.api_key.as_deref(), "ELEVENLABS_API_KEY")?;
        }
    }
    Ok(())
}

/// Transform, publish and extract.
async fn check_reference_pipeline(settings: &Settings) -> Result<()> {
    check_tool("ffmpeg").await?;
    require(settings.storage.endpoint.as_deref(), "S3_ENDPOINT")?;
    require(settings.storage.bucket.as_deref(), "S3_BUCKET")?;
    require(settings.storage.access_key.as_deref(), "S3_ACCESS_KEY")?;
    require(settings.storage.secret_key.as_deref(), "S3_SECRET_KEY")?;
    if settings.extraction.provider == ExtractionProvider::Whisper {
        let key = std::env::var("OPENAI_API_KEY").ok();
        require(key.as_deref(), "OPENAI_API_KEY")?;
    }
    Ok(())
}

fn require(value: Option<&str>, name: &str) -> Result<()> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(VoicecastError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            name, name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_voices_need_elevenlabs_key() {
        let mut settings = Settings::default();
        assert!(check(Operation::Voices, &settings).await.is_err());

        settings.voices.api_key = Some("xi-123".into());
        assert!(check(Operation::Voices, &settings).await.is_ok());
    }

    #[tokio::test]
    async fn test_identity_upload_needs_no_tools() {
        let mut settings = Settings::default();
        settings.voices.api_key = Some("xi-123".into());
        let op = Operation::Generate {
            mode: SynthesisMode::Identity,
            fetch: false,
        };
        assert!(check(op, &settings).await.is_ok());
    }
}
