//! S3-compatible object store (AWS, MinIO, R2, ...).

use super::ObjectStore;
use crate::config::StorageSettings;
use crate::error::{Result, VoicecastError};
use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use std::path::Path;
use tracing::debug;

/// Path-style S3 bucket client.
pub struct S3Store {
    bucket: Box<Bucket>,
    public_base_url: String,
}

impl S3Store {
    /// Construct the client. Missing coordinates or credentials are a
    /// [`VoicecastError::StoreUnavailable`].
    pub fn from_settings(settings: &StorageSettings) -> Result<Self> {
        let missing = |what: &str| VoicecastError::StoreUnavailable(format!("{} not configured", what));

        let endpoint = settings
            .endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| missing("S3 endpoint"))?
            .trim_end_matches('/')
            .to_string();
        let bucket_name = settings
            .bucket
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| missing("S3 bucket"))?;
        let access_key = settings.access_key.as_deref().ok_or_else(|| missing("S3 access key"))?;
        let secret_key = settings.secret_key.as_deref().ok_or_else(|| missing("S3 secret key"))?;

        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .map_err(|e| VoicecastError::StoreUnavailable(format!("invalid S3 credentials: {}", e)))?;

        let region = Region::Custom {
            region: settings.region.clone(),
            endpoint: endpoint.clone(),
        };

        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| VoicecastError::StoreUnavailable(format!("error creating S3 client: {}", e)))?
            .with_path_style();

        let public_base_url = match settings.public_base_url.as_deref() {
            Some(base) if !base.is_empty() => base.trim_end_matches('/').to_string(),
            _ => format!("{}/{}", endpoint, bucket_name),
        };

        Ok(Self {
            bucket,
            public_base_url,
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(&self, key: &str, local_path: &Path, content_type: &str) -> Result<String> {
        let content = tokio::fs::read(local_path).await.map_err(|e| {
            VoicecastError::PublishFailed(format!("cannot read {}: {}", local_path.display(), e))
        })?;

        debug!("Uploading {} bytes to bucket {}", content.len(), self.bucket.name());

        let response = self
            .bucket
            .put_object_with_content_type(key, &content, content_type)
            .await
            .map_err(|e| VoicecastError::PublishFailed(format!("error uploading file to S3: {}", e)))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(VoicecastError::PublishFailed(format!(
                "S3 upload returned status {}",
                status
            )));
        }

        Ok(format!("{}/{}", self.public_base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> StorageSettings {
        StorageSettings {
            endpoint: Some("https://minio.example.com/".into()),
            bucket: Some("clips".into()),
            access_key: Some("access".into()),
            secret_key: Some("secret".into()),
            ..StorageSettings::default()
        }
    }

    #[test]
    fn test_public_url_defaults_to_path_style() {
        let store = S3Store::from_settings(&configured()).unwrap();
        assert_eq!(store.public_base_url, "https://minio.example.com/clips");
    }

    #[test]
    fn test_public_base_url_override() {
        let mut settings = configured();
        settings.public_base_url = Some("https://cdn.example.com/".into());
        let store = S3Store::from_settings(&settings).unwrap();
        assert_eq!(store.public_base_url, "https://cdn.example.com");
    }

    #[test]
    fn test_missing_credentials_are_store_unavailable() {
        let mut settings = configured();
        settings.secret_key = None;
        assert!(matches!(
            S3Store::from_settings(&settings),
            Err(VoicecastError::StoreUnavailable(msg)) if msg.contains("secret")
        ));
    }
}
