//! Raw audio acquisition with an on-disk cache.

use super::{non_empty_len, ArtifactKind, LocalArtifact, MediaFetcher};
use crate::error::{Result, VoicecastError};
use crate::locks::KeyedLocks;
use crate::source::{SourceIdentity, SourceReference};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Extension of audio downloaded from URLs.
const DOWNLOAD_EXTENSION: &str = "mp3";

/// Extension of browser recordings.
const RECORDING_EXTENSION: &str = "webm";

/// Produces the durable raw audio file for a source identity.
///
/// The file lives at `{output_dir}/{identity}.{ext}`. If it exists the
/// acquirer returns it without touching the network. New files are written
/// to a staging name and renamed into place once verified, so a failed or
/// cancelled fetch never leaves a file at the final path.
pub struct MediaAcquirer {
    output_dir: PathBuf,
    fetcher: Arc<dyn MediaFetcher>,
    max_fetch_seconds: u32,
    locks: KeyedLocks,
}

impl MediaAcquirer {
    pub fn new(output_dir: PathBuf, fetcher: Arc<dyn MediaFetcher>, max_fetch_seconds: u32) -> Self {
        Self {
            output_dir,
            fetcher,
            max_fetch_seconds,
            locks: KeyedLocks::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Deterministic location of the raw file for `identity`.
    pub fn raw_path(&self, identity: &SourceIdentity, reference: &SourceReference) -> PathBuf {
        let ext = match reference {
            SourceReference::Url(_) => DOWNLOAD_EXTENSION,
            SourceReference::Upload(upload) => upload.extension(),
            SourceReference::Recording(_) => RECORDING_EXTENSION,
        };
        self.output_dir.join(format!("{}.{}", identity, ext))
    }

    /// Return the raw artifact for `identity`, fetching or storing it if needed.
    #[instrument(skip(self, reference), fields(identity = %identity))]
    pub async fn acquire(
        &self,
        identity: &SourceIdentity,
        reference: &SourceReference,
    ) -> Result<LocalArtifact> {
        let target = self.raw_path(identity, reference);

        if let Some(artifact) = self.cached(identity, &target).await {
            return Ok(artifact);
        }

        let _guard = self.locks.lock(identity.as_str()).await;

        // Another request may have finished the download while we waited
        if let Some(artifact) = self.cached(identity, &target).await {
            return Ok(artifact);
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;

        let ext = target.extension().and_then(|e| e.to_str()).unwrap_or(DOWNLOAD_EXTENSION);
        let staging = Staging::new(&self.output_dir, identity, ext);

        self.write_staging(reference, &staging.path).await?;
        self.verify(&staging.path).await?;

        tokio::fs::rename(&staging.path, &target).await.map_err(|e| {
            VoicecastError::AcquisitionFailed(format!("failed to move audio into place: {}", e))
        })?;

        info!("Stored source audio at {}", target.display());
        Ok(LocalArtifact::new(target, identity.clone(), ArtifactKind::Raw))
    }

    async fn cached(&self, identity: &SourceIdentity, target: &Path) -> Option<LocalArtifact> {
        non_empty_len(target).await.map(|_| {
            info!("Using cached audio file");
            LocalArtifact::new(target.to_path_buf(), identity.clone(), ArtifactKind::Raw)
        })
    }

    async fn write_staging(&self, reference: &SourceReference, staging: &Path) -> Result<()> {
        match reference {
            SourceReference::Url(url) => {
                self.fetcher
                    .fetch(url, staging, self.max_fetch_seconds)
                    .await
            }
            SourceReference::Upload(upload) => tokio::fs::write(staging, upload.bytes())
                .await
                .map_err(|e| VoicecastError::AcquisitionFailed(format!("failed to save upload: {}", e))),
            SourceReference::Recording(bytes) => tokio::fs::write(staging, bytes)
                .await
                .map_err(|e| {
                    VoicecastError::AcquisitionFailed(format!("failed to save recording: {}", e))
                }),
        }
    }

    /// A tool reporting success is not enough: the file must exist and have content.
    async fn verify(&self, staging: &Path) -> Result<()> {
        match non_empty_len(staging).await {
            Some(len) => {
                debug!("Fetched {} bytes", len);
                Ok(())
            }
            None => Err(VoicecastError::AcquisitionFailed(format!(
                "output file not created: {}",
                staging.display()
            ))),
        }
    }
}

/// Staging location for one acquisition.
///
/// On drop every file in the directory starting with the staging stem is
/// removed. That covers the staging file itself after a failure, timeout or
/// cancellation, and intermediates the fetch tool leaves next to it.
struct Staging {
    dir: PathBuf,
    stem: String,
    path: PathBuf,
}

impl Staging {
    fn new(dir: &Path, identity: &SourceIdentity, ext: &str) -> Self {
        let stem = format!(".{}.{}.partial", identity, uuid::Uuid::new_v4().simple());
        let path = dir.join(format!("{}.{}", stem, ext));
        Self {
            dir: dir.to_path_buf(),
            stem,
            path,
        }
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read directory for cleanup: {}", e);
                return;
            }
        };

        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with(&self.stem) {
                if let Err(e) = std::fs::remove_file(entry.path()) {
                    warn!("Failed to remove partial download {}: {}", entry.path().display(), e);
                }
            }
        }
    }
}
