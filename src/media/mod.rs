//! Audio acquisition and processing.
//!
//! - [`MediaAcquirer`] turns a reference into a durable raw audio file, at
//!   most once per source identity.
//! - [`AudioTransformer`] cuts that file down to a short, small reference clip.
//!
//! The external tools (yt-dlp, ffmpeg) sit behind the [`MediaFetcher`] and
//! [`Transcoder`] traits.

mod acquirer;
mod ffmpeg;
mod tools;
mod transform;
mod ytdlp;

pub use acquirer::MediaAcquirer;
pub use ffmpeg::FfmpegTranscoder;
pub use tools::{check_tool, run_tool};
pub use transform::{AudioTransformer, ReferenceClip};
pub use ytdlp::{CookieSource, YtDlpFetcher};

use crate::error::Result;
use crate::source::SourceIdentity;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// What stage produced a local file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Durable per-identity download or upload.
    Raw,
    /// Short-lived trimmed and re-encoded clip.
    Transformed,
}

/// An audio file on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifact {
    pub path: PathBuf,
    pub identity: SourceIdentity,
    pub kind: ArtifactKind,
}

impl LocalArtifact {
    pub fn new(path: PathBuf, identity: SourceIdentity, kind: ArtifactKind) -> Self {
        Self { path, identity, kind }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string()
    }
}

/// Encoding parameters for a transformed clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeProfile {
    pub duration_seconds: u32,
    /// Bitrate in ffmpeg syntax, e.g. `64k`.
    pub bitrate: String,
    pub sample_rate: u32,
    pub channels: u8,
}

/// Downloads the audio track of a remote video.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch audio from `reference` into `output_path`, keeping at most
    /// `max_duration_seconds`.
    async fn fetch(&self, reference: &str, output_path: &Path, max_duration_seconds: u32)
        -> Result<()>;
}

/// Re-encodes a local audio file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, input: &Path, output: &Path, profile: &TranscodeProfile)
        -> Result<()>;
}

/// Size of a file, or `None` if it is missing or empty.
pub(crate) async fn non_empty_len(path: &Path) -> Option<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Some(meta.len()),
        _ => None,
    }
}
