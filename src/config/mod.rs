//! Configuration module for Voicecast.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    ExtractionProvider, ExtractionSettings, GeneralSettings, MediaSettings, PipelineSettings,
    Settings, StorageSettings, SynthesisSettings, VoiceSettings,
};
