//! Publishing reference clips to durable, publicly fetchable storage.

mod s3;

pub use s3::S3Store;

use crate::config::StorageSettings;
use crate::error::{Result, VoicecastError};
use crate::media::LocalArtifact;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Content type of published clips.
const CLIP_CONTENT_TYPE: &str = "audio/mpeg";

/// Object storage capability.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file under `key` and return its public URL.
    async fn put_object(&self, key: &str, local_path: &Path, content_type: &str) -> Result<String>;
}

/// A URL a synthesis provider can fetch audio from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAudioRef {
    pub url: String,
    pub key: String,
}

/// Uploads transformed clips under collision-resistant keys.
pub struct Publisher {
    store: std::result::Result<Arc<dyn ObjectStore>, String>,
    prefix: String,
}

impl Publisher {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store: Ok(store),
            prefix: prefix.into(),
        }
    }

    /// A publisher whose store could not be constructed. Every publish fails
    /// with [`VoicecastError::StoreUnavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            store: Err(reason.into()),
            prefix: String::new(),
        }
    }

    /// Build the S3 store from settings; a misconfiguration is remembered
    /// rather than fatal so identity-mode requests keep working.
    pub fn from_settings(settings: &StorageSettings) -> Self {
        match S3Store::from_settings(settings) {
            Ok(store) => Self::new(Arc::new(store), settings.prefix.clone()),
            Err(e) => {
                warn!("Object store not initialized: {}", e);
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.store.is_ok()
    }

    /// `{prefix}/{unix_millis}_{file_name}`
    fn object_key(&self, artifact: &LocalArtifact) -> String {
        let name = format!(
            "{}_{}",
            chrono::Utc::now().timestamp_millis(),
            artifact.file_name()
        );
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        }
    }

    #[instrument(skip(self, artifact), fields(identity = %artifact.identity))]
    pub async fn publish(&self, artifact: &LocalArtifact) -> Result<RemoteAudioRef> {
        let store = self
            .store
            .as_ref()
            .map_err(|reason| VoicecastError::StoreUnavailable(reason.clone()))?;

        let key = self.object_key(artifact);
        info!("Uploading {} as {}", artifact.path.display(), key);

        let url = store.put_object(&key, &artifact.path, CLIP_CONTENT_TYPE).await?;
        info!("File uploaded successfully, public URL: {}", url);

        Ok(RemoteAudioRef { url, key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ArtifactKind;
    use crate::source::SourceIdentity;
    use crate::test_support::FakeStore;

    fn clip() -> LocalArtifact {
        LocalArtifact::new(
            "/tmp/abcdefghijk_0001_compressed.mp3".into(),
            SourceIdentity::parse("abcdefghijk").unwrap(),
            ArtifactKind::Transformed,
        )
    }

    #[tokio::test]
    async fn test_publish_uses_prefixed_timestamped_key() {
        let store = Arc::new(FakeStore::new(false));
        let publisher = Publisher::new(store.clone(), "/audio/");

        let remote = publisher.publish(&clip()).await.unwrap();

        assert!(remote.key.starts_with("audio/"));
        assert!(remote.key.ends_with("_abcdefghijk_0001_compressed.mp3"));
        assert_eq!(remote.url, format!("https://store.test/{}", remote.key));
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_store_is_distinguishable() {
        let publisher = Publisher::unavailable("S3 bucket not configured");
        let err = publisher.publish(&clip()).await.unwrap_err();
        assert!(matches!(err, VoicecastError::StoreUnavailable(_)));
        assert!(!publisher.is_available());
    }

    #[tokio::test]
    async fn test_upload_failure_is_publish_failure() {
        let publisher = Publisher::new(Arc::new(FakeStore::new(true)), "audio");
        let err = publisher.publish(&clip()).await.unwrap_err();
        assert!(matches!(err, VoicecastError::PublishFailed(_)));
    }

    #[test]
    fn test_from_settings_without_bucket_is_unavailable() {
        let publisher = Publisher::from_settings(&StorageSettings::default());
        assert!(!publisher.is_available());
    }
}
