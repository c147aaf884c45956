//! Cloudflare R2 photo storage.

use std::env;
use std::fmt;

use aws_credential_types::Credentials;
use aws_sdk_s3::{primitives::ByteStream, Client};
use aws_types::region::Region;

use super::{build_object_key, BlobStore, BlobUpload, StoredBlob};
use crate::util::is_http_url;
use crate::{Error, Result};

const ENV_ACCOUNT_ID: &str = "R2_ACCOUNT_ID";
const ENV_BUCKET: &str = "R2_BUCKET";
const ENV_ACCESS_KEY_ID: &str = "R2_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "R2_SECRET_ACCESS_KEY";
const ENV_PUBLIC_BASE_URL: &str = "R2_PUBLIC_BASE_URL";

/// Cloudflare R2 configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct R2Config {
    /// Cloudflare account identifier.
    pub account_id: String,
    /// R2 bucket name.
    pub bucket: String,
    /// Access key id for S3-compatible auth.
    pub access_key_id: String,
    /// Secret access key for S3-compatible auth.
    pub secret_access_key: String,
    /// Public URL base the bucket is served from; photo URLs hang off it.
    pub public_base_url: String,
}

impl fmt::Debug for R2Config {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("R2Config")
            .field("account_id", &self.account_id)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

impl R2Config {
    /// Load R2 configuration from environment variables.
    ///
    /// Returns `Ok(None)` when no R2 variables are set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let fields = [
            (ENV_ACCOUNT_ID, read(ENV_ACCOUNT_ID)),
            (ENV_BUCKET, read(ENV_BUCKET)),
            (ENV_ACCESS_KEY_ID, read(ENV_ACCESS_KEY_ID)),
            (ENV_SECRET_ACCESS_KEY, read(ENV_SECRET_ACCESS_KEY)),
            (ENV_PUBLIC_BASE_URL, read(ENV_PUBLIC_BASE_URL)),
        ];

        if fields.iter().all(|(_, value)| value.is_none()) {
            return Ok(None);
        }

        let missing = fields
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(Error::InvalidInput(format!(
                "R2 configuration is incomplete. Missing: {}",
                missing.join(", ")
            )));
        }

        let [account_id, bucket, access_key_id, secret_access_key, public_base_url] =
            fields.map(|(_, value)| value.unwrap_or_default());

        if !is_http_url(&public_base_url) {
            return Err(Error::InvalidInput(
                "R2_PUBLIC_BASE_URL must start with http:// or https://".to_string(),
            ));
        }

        Ok(Some(Self {
            account_id,
            bucket,
            access_key_id,
            secret_access_key,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }))
    }

    /// Cloudflare R2 S3-compatible endpoint URL.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }

    /// Public URL of an object key.
    #[must_use]
    pub fn public_object_url(&self, object_key: &str) -> String {
        format!("{}/{}", self.public_base_url, object_key.trim_matches('/'))
    }
}

/// R2-backed [`BlobStore`].
#[derive(Clone)]
pub struct R2BlobStore {
    config: R2Config,
    client: Client,
}

impl R2BlobStore {
    pub fn new(config: R2Config) -> Self {
        let client = build_s3_client(&config);
        Self { config, client }
    }

    #[must_use]
    pub const fn config(&self) -> &R2Config {
        &self.config
    }

    /// Check that the configured bucket is reachable with current credentials.
    pub async fn bucket_is_reachable(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|error| storage_error("head_bucket", &self.config.bucket, None, error))?;
        Ok(())
    }
}

impl BlobStore for R2BlobStore {
    async fn put_public(&self, upload: BlobUpload) -> Result<StoredBlob> {
        let key = build_object_key(&upload.container, &upload.file_name)?;
        let size = upload.bytes.len();

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_type(upload.content_type)
            .body(ByteStream::from(upload.bytes))
            .send()
            .await
            .map_err(|error| storage_error("put_object", &self.config.bucket, Some(&key), error))?;

        tracing::debug!(bucket = %self.config.bucket, key = %key, size, "Stored photo");
        let url = self.config.public_object_url(&key);
        Ok(StoredBlob { key, url })
    }

    async fn delete(&self, blob: &StoredBlob) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(&blob.key)
            .send()
            .await
            .map_err(|error| {
                storage_error(
                    "delete_object",
                    &self.config.bucket,
                    Some(&blob.key),
                    error,
                )
            })?;
        Ok(())
    }
}

fn build_s3_client(config: &R2Config) -> Client {
    let credentials = Credentials::new(
        config.access_key_id.clone(),
        config.secret_access_key.clone(),
        None,
        None,
        "patrol-core-r2-storage",
    );

    let sdk_config = aws_sdk_s3::config::Builder::new()
        .region(Region::new("auto"))
        .credentials_provider(credentials)
        .endpoint_url(config.endpoint_url())
        .force_path_style(true)
        .build();

    Client::from_conf(sdk_config)
}

fn storage_error(
    operation: &str,
    bucket: &str,
    object_key: Option<&str>,
    error: impl std::fmt::Display,
) -> Error {
    let target = object_key.map_or_else(|| bucket.to_string(), |key| format!("{bucket}/{key}"));
    let detail = error.to_string().replace('\n', " ");
    Error::Storage(format!("R2 {operation} failed for {target}: {}", detail.trim()))
}
