//! src/services/object_store.rs
//!
//! ObjectStore — thin wrapper over the S3 client covering the three object
//! concerns this service has: generating per-client object keys, presigning
//! time-limited upload URLs so browsers push bytes straight to the bucket,
//! and deleting objects by key when a client is removed.

use crate::config::AppConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::presigning::PresigningConfig;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Validity window for a presigned upload URL.
const UPLOAD_GRANT_EXPIRY: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("upload authorization failed: {0}")]
    UploadAuthorization(String),
    #[error("object deletion failed for `{key}`: {message}")]
    Delete { key: String, message: String },
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

/// A minted upload grant: where to PUT the bytes, and the key the caller
/// must echo back when registering the client record.
#[derive(Debug)]
pub struct PresignedUpload {
    pub upload_url: String,
    pub key: String,
}

/// Shared S3-backed object store handle, constructed once at startup.
#[derive(Clone)]
pub struct ObjectStore {
    client: S3Client,
    bucket: String,
    endpoint_url: Option<String>,
}

impl ObjectStore {
    /// Build the S3 client from the ambient AWS environment (credentials
    /// come from the usual provider chain), honoring a custom endpoint and
    /// path-style addressing for MinIO-style local stores.
    pub async fn new(cfg: &AppConfig) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(cfg.aws_region.clone()))
            .load()
            .await;

        let mut builder = S3ConfigBuilder::from(&aws_config);
        if let Some(endpoint) = &cfg.s3_endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        if cfg.s3_force_path_style {
            builder = builder.force_path_style(true);
        }

        let client = S3Client::from_conf(builder.build());

        info!(
            bucket = %cfg.s3_bucket,
            region = %cfg.aws_region,
            "object store client initialized"
        );

        Self {
            client,
            bucket: cfg.s3_bucket.clone(),
            endpoint_url: cfg.s3_endpoint_url.clone(),
        }
    }

    /// Wrap an already-built client. Used by tests.
    pub fn with_client(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            endpoint_url: None,
        }
    }

    /// Generate a fresh object key of the form
    /// `clients/{client_id}/{uuid}_{file_name}`.
    ///
    /// The UUID makes collisions negligible without consulting the store;
    /// the `clients/{client_id}/` prefix groups all of one client's objects.
    pub fn generate_key(&self, client_id: &str, file_name: &str) -> String {
        format!("clients/{}/{}_{}", client_id, Uuid::new_v4(), file_name)
    }

    /// Mint a time-limited write grant for a freshly generated key.
    ///
    /// Presigns a `PutObject` scoped to this bucket, the new key, and the
    /// declared content type, valid for 300 seconds. No object is created
    /// here; the caller is trusted to perform the upload before referencing
    /// the key in a client record.
    pub async fn presign_upload(
        &self,
        file_name: &str,
        file_type: &str,
        client_id: &str,
    ) -> ObjectStoreResult<PresignedUpload> {
        let key = self.generate_key(client_id, file_name);

        let presigning = PresigningConfig::expires_in(UPLOAD_GRANT_EXPIRY)
            .map_err(|err| ObjectStoreError::UploadAuthorization(err.to_string()))?;

        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(file_type)
            .presigned(presigning)
            .await
            .map_err(|err| ObjectStoreError::UploadAuthorization(err.to_string()))?;

        debug!(key = %key, "minted upload grant");

        Ok(PresignedUpload {
            upload_url: presigned.uri().to_string(),
            key,
        })
    }

    /// Delete one object by key.
    ///
    /// Callers on the deletion path treat failures as non-fatal; this method
    /// just reports them.
    pub async fn delete_object(&self, key: &str) -> ObjectStoreResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| ObjectStoreError::Delete {
                key: key.to_string(),
                message: err.to_string(),
            })?;

        debug!(key = %key, "object deleted");
        Ok(())
    }

    /// Publicly resolvable retrieval URL for a stored key.
    ///
    /// Virtual-hosted AWS form by default; path-style against the custom
    /// endpoint when one is configured.
    pub fn object_url(&self, key: &str) -> String {
        match &self.endpoint_url {
            Some(endpoint) => {
                format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
            }
            None => format!("https://{}.s3.amazonaws.com/{}", self.bucket, key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::{Credentials, Region};

    fn test_store() -> ObjectStore {
        let conf = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("akid", "secret", None, None, "static"))
            .build();
        ObjectStore::with_client(S3Client::from_conf(conf), "registry-test")
    }

    #[test]
    fn generated_keys_are_scoped_and_unique() {
        let store = test_store();
        let a = store.generate_key("C123", "photo.png");
        let b = store.generate_key("C123", "photo.png");

        assert!(a.starts_with("clients/C123/"));
        assert!(a.ends_with("_photo.png"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn presign_upload_returns_grant_for_fresh_key() {
        // Presigning is pure local signing; no network involved.
        let store = test_store();
        let grant = store
            .presign_upload("photo.png", "image/png", "C123")
            .await
            .unwrap();

        assert!(grant.key.starts_with("clients/C123/"));
        assert!(grant.key.ends_with("_photo.png"));
        assert!(grant.upload_url.contains("registry-test"));
        assert!(grant.upload_url.contains("X-Amz-Expires=300"));
    }

    #[tokio::test]
    async fn repeated_grants_use_independent_keys() {
        let store = test_store();
        let a = store
            .presign_upload("photo.png", "image/png", "C123")
            .await
            .unwrap();
        let b = store
            .presign_upload("photo.png", "image/png", "C123")
            .await
            .unwrap();
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn object_url_uses_virtual_hosted_form() {
        let store = test_store();
        assert_eq!(
            store.object_url("clients/C1/abc_photo.png"),
            "https://registry-test.s3.amazonaws.com/clients/C1/abc_photo.png"
        );
    }

    #[test]
    fn object_url_uses_path_style_with_custom_endpoint() {
        let mut store = test_store();
        store.endpoint_url = Some("http://localhost:9000/".into());
        assert_eq!(
            store.object_url("clients/C1/abc_photo.png"),
            "http://localhost:9000/registry-test/clients/C1/abc_photo.png"
        );
    }
}
