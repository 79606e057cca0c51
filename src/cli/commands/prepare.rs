//! Prepare command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::source::SourceReference;
use anyhow::Result;

/// Publish a reference clip for `url` and print it as JSON for later synthesis.
pub async fn run_prepare(url: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Prepare, &settings).await {
        Output::error(&format!("{}", e));
        Output::info("Run 'voicecast doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let spinner = Output::spinner("Preparing reference clip...");
    let result = orchestrator
        .prepare_reference(&SourceReference::Url(url.to_string()))
        .await;
    spinner.finish_and_clear();

    match result {
        Ok(prepared) => {
            println!("{}", serde_json::to_string_pretty(&prepared)?);
            Ok(())
        }
        Err(failure) => {
            Output::error(&failure.to_string());
            Err(failure.into())
        }
    }
}
