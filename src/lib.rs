//! Voicecast - speech in the voice of any video
//!
//! Takes a video URL (YouTube, YouTube Shorts, TikTok) or an uploaded clip,
//! extracts its audio, and synthesizes new speech that sounds like the
//! speaker.
//!
//! # Overview
//!
//! Two synthesis modes are supported:
//! - **Reference**: a short clip is cut from the source, published to object
//!   storage and transcribed. A voice-clone TTS endpoint is conditioned on
//!   the clip URL and its transcript.
//! - **Identity**: the source audio is cloned into a persistent provider
//!   voice, kept in a bounded cache keyed by source identity.
//!
//! # Architecture
//!
//! - `source` - Source identity resolution and upload validation
//! - `media` - Audio acquisition (yt-dlp) and transformation (ffmpeg)
//! - `publish` - Object storage publishing
//! - `extraction` - Reference text extraction
//! - `voice` - Voice providers, synthesizers and the voice cache
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use voicecast::config::Settings;
//! use voicecast::orchestrator::{GenerateRequest, Orchestrator, SynthesisMode};
//! use voicecast::source::SourceReference;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let speech = orchestrator
//!         .generate(GenerateRequest {
//!             reference: SourceReference::Url("https://youtu.be/dQw4w9WgXcQ".into()),
//!             text: "Hello there".into(),
//!             mode: SynthesisMode::Identity,
//!         })
//!         .await?;
//!     println!("Saved {}", speech.path.display());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod extraction;
pub mod locks;
pub mod media;
pub mod openai;
pub mod orchestrator;
pub mod publish;
pub mod source;
pub mod voice;

#[cfg(test)]
mod test_support;

pub use error::{PipelineFailure, Result, Stage, VoicecastError};
