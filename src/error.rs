//! Error types for Voicecast.

use thiserror::Error;

/// Library-level error type for Voicecast operations.
#[derive(Error, Debug)]
pub enum VoicecastError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolUnavailable(String),

    #[error("Audio acquisition failed: {0}")]
    AcquisitionFailed(String),

    #[error("Audio transform failed: {0}")]
    TransformFailed(String),

    #[error("Object store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Upload failed: {0}")]
    PublishFailed(String),

    #[error("Reference text extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Voice listing failed: {0}")]
    VoiceListing(String),

    #[error("Voice clone failed: {0}")]
    CloneFailed(String),

    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Failed to save output audio: {0}")]
    PersistFailed(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Voicecast operations.
pub type Result<T> = std::result::Result<T, VoicecastError>;

/// A step of the synthesis pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Resolving,
    Acquiring,
    Transforming,
    Publishing,
    Extracting,
    Cloning,
    Synthesizing,
    Persisting,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Resolving => "resolving",
            Stage::Acquiring => "acquiring",
            Stage::Transforming => "transforming",
            Stage::Publishing => "publishing",
            Stage::Extracting => "extracting",
            Stage::Cloning => "cloning",
            Stage::Synthesizing => "synthesizing",
            Stage::Persisting => "persisting",
        };
        write!(f, "{}", name)
    }
}

/// Terminal failure of a pipeline run: the stage that failed and why.
#[derive(Error, Debug)]
#[error("{stage} failed: {error}")]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub error: VoicecastError,
}

impl PipelineFailure {
    pub fn new(stage: Stage, error: VoicecastError) -> Self {
        Self { stage, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_failure_names_stage() {
        let failure = PipelineFailure::new(
            Stage::Publishing,
            VoicecastError::StoreUnavailable("bucket not configured".into()),
        );
        assert_eq!(
            failure.to_string(),
            "publishing failed: Object store unavailable: bucket not configured"
        );
    }
}
