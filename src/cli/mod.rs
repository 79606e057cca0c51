//! CLI module for Voicecast.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::orchestrator::SynthesisMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Voicecast - speak any text in the voice of a video
///
/// Fetches the audio of a YouTube or TikTok video (or takes an uploaded clip)
/// and synthesizes new speech that sounds like its speaker.
#[derive(Parser, Debug)]
#[command(name = "voicecast")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "VOICECAST_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the voice comes from. Exactly one is required.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// YouTube, YouTube Shorts or TikTok URL
    #[arg(long)]
    pub url: Option<String>,

    /// Audio file to use as the voice (mp3, wav, m4a, ogg, flac, webm)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Browser recording (webm)
    #[arg(long)]
    pub recording: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Generate speech in the voice of a source
    Generate {
        #[command(flatten)]
        source: SourceArgs,

        /// Text to speak
        #[arg(short, long)]
        text: String,

        /// Synthesis mode (reference, identity); defaults to the configured mode
        #[arg(short, long)]
        mode: Option<SynthesisMode>,
    },

    /// Publish a reference clip and its transcript for later synthesis
    Prepare {
        /// YouTube, YouTube Shorts or TikTok URL
        url: String,
    },

    /// Inspect cloned voices
    Voices {
        #[command(subcommand)]
        action: VoicesAction,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum VoicesAction {
    /// List cloned voices in eviction order
    List,

    /// Show the voice cloned for a source identity
    Lookup {
        /// Source identity, e.g. a YouTube video ID
        identity: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_parses_mode() {
        let cli = Cli::parse_from([
            "voicecast",
            "generate",
            "--url",
            "https://youtu.be/abcdefghijk",
            "--text",
            "hello",
            "--mode",
            "identity",
        ]);
        match cli.command {
            Commands::Generate { source, mode, .. } => {
                assert_eq!(source.url.as_deref(), Some("https://youtu.be/abcdefghijk"));
                assert_eq!(mode, Some(SynthesisMode::Identity));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_generate_requires_exactly_one_source() {
        assert!(Cli::try_parse_from(["voicecast", "generate", "--text", "hi"]).is_err());
        assert!(Cli::try_parse_from([
            "voicecast",
            "generate",
            "--url",
            "https://youtu.be/abcdefghijk",
            "--file",
            "a.mp3",
            "--text",
            "hi",
        ])
        .is_err());
    }
}
