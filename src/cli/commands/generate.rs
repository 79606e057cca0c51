//! Generate command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, SourceArgs};
use crate::config::Settings;
use crate::orchestrator::{GenerateRequest, Orchestrator, SynthesisMode};
use crate::source::{SourceReference, UploadedAudio};
use anyhow::{Context, Result};

/// Run the generate command.
pub async fn run_generate(
    source: &SourceArgs,
    text: &str,
    mode: Option<SynthesisMode>,
    settings: Settings,
) -> Result<()> {
    let mode = mode.unwrap_or(settings.synthesis.default_mode);

    let operation = Operation::Generate {
        mode,
        fetch: source.url.is_some(),
    };
    if let Err(e) = preflight::check(operation, &settings).await {
        Output::error(&format!("{}", e));
        Output::info("Run 'voicecast doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let reference = source_reference(source, &settings).await?;
    Output::info(&format!("Generating {} speech from {}", mode, reference.describe()));

    let orchestrator = Orchestrator::new(settings)?;
    let spinner = Output::spinner("Working...");

    let result = orchestrator
        .generate(GenerateRequest {
            reference,
            text: text.to_string(),
            mode,
        })
        .await;
    spinner.finish_and_clear();

    match result {
        Ok(speech) => {
            Output::success(&format!("Speech saved to {}", speech.path.display()));
            Output::kv("Identity", speech.identity.as_str());
            Ok(())
        }
        Err(failure) => {
            Output::error(&failure.to_string());
            Err(failure.into())
        }
    }
}

async fn source_reference(source: &SourceArgs, settings: &Settings) -> Result<SourceReference> {
    if let Some(url) = &source.url {
        return Ok(SourceReference::Url(url.clone()));
    }

    if let Some(path) = &source.file {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let upload = UploadedAudio::new(bytes, file_name, None, settings.pipeline.max_upload_bytes)?;
        return Ok(SourceReference::Upload(upload));
    }

    if let Some(path) = &source.recording {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if bytes.is_empty() {
            anyhow::bail!("Recording {} is empty", path.display());
        }
        return Ok(SourceReference::Recording(bytes));
    }

    anyhow::bail!("One of --url, --file or --recording is required")
}
