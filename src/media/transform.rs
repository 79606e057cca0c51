//! Reference clip preparation.

use super::{non_empty_len, ArtifactKind, LocalArtifact, TranscodeProfile, Transcoder};
use crate::error::{Result, VoicecastError};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempPath;
use tracing::{info, instrument, warn};

/// A transformed clip in the temp directory.
///
/// The file is deleted when the clip is dropped, so a failed, timed out or
/// cancelled request never leaves it behind.
#[derive(Debug)]
pub struct ReferenceClip {
    pub artifact: LocalArtifact,
    file: TempPath,
}

impl ReferenceClip {
    /// Delete the clip now, logging instead of failing.
    pub fn close(self) {
        let path = self.artifact.path;
        if let Err(e) = self.file.close() {
            warn!("Failed to cleanup audio file {}: {}", path.display(), e);
        }
    }
}

/// Cuts a raw artifact down to a short mono clip that is cheap to upload.
///
/// Outputs go to the temp directory under unique names.
pub struct AudioTransformer {
    transcoder: Arc<dyn Transcoder>,
    temp_dir: PathBuf,
    bitrate: String,
    sample_rate: u32,
}

impl AudioTransformer {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        temp_dir: PathBuf,
        bitrate: impl Into<String>,
        sample_rate: u32,
    ) -> Self {
        Self {
            transcoder,
            temp_dir,
            bitrate: bitrate.into(),
            sample_rate,
        }
    }

    #[instrument(skip(self, artifact), fields(identity = %artifact.identity))]
    pub async fn transform(
        &self,
        artifact: &LocalArtifact,
        max_duration_seconds: u32,
    ) -> Result<ReferenceClip> {
        tokio::fs::create_dir_all(&self.temp_dir).await?;

        let prefix = format!("{}_", artifact.identity);
        let file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix("_compressed.mp3")
            .tempfile_in(&self.temp_dir)
            .map_err(|e| VoicecastError::TransformFailed(format!("cannot create clip file: {}", e)))?
            .into_temp_path();
        let clip = ReferenceClip {
            artifact: LocalArtifact::new(
                file.to_path_buf(),
                artifact.identity.clone(),
                ArtifactKind::Transformed,
            ),
            file,
        };

        let profile = TranscodeProfile {
            duration_seconds: max_duration_seconds,
            bitrate: self.bitrate.clone(),
            sample_rate: self.sample_rate,
            channels: 1,
        };

        info!(
            "Cropping and compressing audio to {} seconds: {}",
            max_duration_seconds,
            clip.artifact.path.display()
        );

        self.transcoder
            .transcode(&artifact.path, &clip.artifact.path, &profile)
            .await?;

        match non_empty_len(&clip.artifact.path).await {
            Some(size) => {
                info!("Compressed file size: {} bytes", size);
                Ok(clip)
            }
            None => Err(VoicecastError::TransformFailed(format!(
                "compressed file missing or empty: {}",
                clip.artifact.path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceIdentity;
    use crate::test_support::{FakeTranscoder, TranscodeBehavior};

    fn raw_artifact(dir: &std::path::Path) -> LocalArtifact {
        let path = dir.join("abcdefghijk.mp3");
        std::fs::write(&path, b"raw audio").unwrap();
        LocalArtifact::new(path, SourceIdentity::parse("abcdefghijk").unwrap(), ArtifactKind::Raw)
    }

    #[tokio::test]
    async fn test_transform_produces_unique_clip() {
        let data = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let transcoder = Arc::new(FakeTranscoder::new(TranscodeBehavior::Copy));
        let transformer = AudioTransformer::new(transcoder.clone(), temp.path().to_path_buf(), "64k", 22050);
        let raw = raw_artifact(data.path());

        let a = transformer.transform(&raw, 15).await.unwrap();
        let b = transformer.transform(&raw, 15).await.unwrap();

        assert_eq!(a.artifact.kind, ArtifactKind::Transformed);
        assert_ne!(a.artifact.path, b.artifact.path);
        assert!(a.artifact.path.starts_with(temp.path()));
        assert!(a.artifact.file_name().starts_with("abcdefghijk_"));
        assert!(raw.path.exists());

        let profile = transcoder.last_profile().unwrap();
        assert_eq!(profile.duration_seconds, 15);
        assert_eq!(profile.channels, 1);
        assert_eq!(profile.sample_rate, 22050);

        let path = a.artifact.path.clone();
        a.close();
        assert!(!path.exists());

        let path = b.artifact.path.clone();
        drop(b);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_empty_output_is_failure() {
        let data = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let transcoder = Arc::new(FakeTranscoder::new(TranscodeBehavior::WriteEmpty));
        let transformer = AudioTransformer::new(transcoder, temp.path().to_path_buf(), "64k", 22050);

        let err = transformer.transform(&raw_artifact(data.path()), 15).await.unwrap_err();
        assert!(matches!(err, VoicecastError::TransformFailed(_)));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_transcoder_error_propagates() {
        let data = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let transcoder = Arc::new(FakeTranscoder::new(TranscodeBehavior::Fail));
        let transformer = AudioTransformer::new(transcoder, temp.path().to_path_buf(), "64k", 22050);

        let err = transformer.transform(&raw_artifact(data.path()), 15).await.unwrap_err();
        assert!(matches!(err, VoicecastError::TransformFailed(_)));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_transform_removes_clip() {
        let data = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let transcoder = Arc::new(FakeTranscoder::new(TranscodeBehavior::Hang));
        let transformer = AudioTransformer::new(transcoder, temp.path().to_path_buf(), "64k", 22050);
        let raw = raw_artifact(data.path());

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            transformer.transform(&raw, 15),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }
}
