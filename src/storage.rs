use async_trait::async_trait;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("duplicate")]
    Duplicate,
    #[error("not_found")]
    NotFound,
    #[error("other: {0}")]
    Other(String),
}

/// Content-addressed store for complaint / recyclable-item photos.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn save(&self, hash: &str, mime: &str, bytes: &[u8]) -> Result<(), ImageStoreError>;
    async fn load(&self, hash: &str) -> Result<(Vec<u8>, String), ImageStoreError>;
    async fn delete(&self, hash: &str) -> Result<(), ImageStoreError>;
}

// ---------------- S3 implementation (MinIO compatible) ----------------
pub struct S3ImageStore {
    bucket: String,
    client: aws_sdk_s3::Client,
    prefix: String,
}

impl S3ImageStore {
    pub async fn new() -> anyhow::Result<Self> {
        use aws_credential_types::provider::SharedCredentialsProvider;
        use aws_credential_types::Credentials;

        let configured_bucket =
            std::env::var("S3_BUCKET").unwrap_or_else(|_| "safai-images".into());
        let endpoint = std::env::var("S3_ENDPOINT")
            .map_err(|_| anyhow::anyhow!("S3_ENDPOINT must be set (MinIO / S3 endpoint)"))?;
        let region = std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into());
        let access = std::env::var("S3_ACCESS_KEY").unwrap_or_default();
        let secret = std::env::var("S3_SECRET_KEY").unwrap_or_default();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region));
        loader = loader.endpoint_url(endpoint);
        if !access.is_empty() && !secret.is_empty() {
            let creds = Credentials::new(access, secret, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(creds));
        }
        let conf = loader.load().await;
        // Path-style addressing; MinIO/local endpoints rarely have wildcard DNS.
        let s3_conf = aws_sdk_s3::config::Builder::from(&conf)
            .force_path_style(true)
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_conf);
        info!("initialized S3/MinIO client (path-style addressing)");

        let bucket = Self::resolve_bucket(&client, &configured_bucket).await?;

        Ok(Self {
            bucket,
            client,
            prefix: "images".into(),
        })
    }

    /// The configured bucket name may not match the stored bucket's case
    /// (dashboards normalize names differently). Resolve against the
    /// actual bucket list first; create the bucket only when no
    /// case-insensitive match exists.
    async fn resolve_bucket(
        client: &aws_sdk_s3::Client,
        configured: &str,
    ) -> anyhow::Result<String> {
        match client.list_buckets().send().await {
            Ok(out) => {
                let existing = out
                    .buckets()
                    .iter()
                    .filter_map(|b| b.name())
                    .find(|name| name.eq_ignore_ascii_case(configured));
                if let Some(name) = existing {
                    if name != configured {
                        warn!("bucket '{configured}' resolved to '{name}' (case mismatch)");
                    }
                    return Ok(name.to_string());
                }
            }
            Err(e) => {
                warn!("list_buckets failed (will attempt create of '{configured}'): {e:?}");
            }
        }

        let mut attempt = 0u32;
        let max_attempts = 8;
        loop {
            attempt += 1;
            match client.create_bucket().bucket(configured).send().await {
                Ok(_) => {
                    info!("created bucket '{configured}' (attempt {attempt})");
                    return Ok(configured.to_string());
                }
                Err(e) => {
                    if attempt >= max_attempts {
                        error!("create_bucket failed for '{configured}' after {attempt} attempts: {e:?}");
                        return Err(anyhow::anyhow!("failed to ensure bucket '{configured}': {e}"));
                    }
                    let backoff_ms = 200 * attempt.pow(2);
                    warn!("create_bucket attempt {attempt} failed for '{configured}': {e:?} (retrying in {backoff_ms}ms)");
                    tokio::time::sleep(std::time::Duration::from_millis(backoff_ms as u64)).await;
                }
            }
        }
    }

    fn key_for(&self, hash: &str) -> String {
        format!("{}/{}/{}", self.prefix, &hash[0..2], hash)
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn save(&self, hash: &str, _mime: &str, bytes: &[u8]) -> Result<(), ImageStoreError> {
        use aws_sdk_s3::primitives::ByteStream;
        let key = self.key_for(hash);
        // HEAD first to keep uploads idempotent.
        if self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .is_ok()
        {
            return Err(ImageStoreError::Duplicate);
        }
        let put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes.to_vec()))
            .content_type(
                infer::get(bytes)
                    .map(|t| t.mime_type().to_string())
                    .unwrap_or_else(|| "application/octet-stream".into()),
            );
        if let Err(e) = put.send().await {
            error!(
                "put_object failed hash={hash} key={key} bucket={} err={:?}",
                self.bucket, e
            );
            let hint = if e.to_string().contains("NoSuchBucket") {
                " (bucket missing or not yet propagated)"
            } else if e.to_string().contains("AccessDenied") {
                " (check S3_ACCESS_KEY/S3_SECRET_KEY permissions)"
            } else {
                ""
            };
            return Err(ImageStoreError::Other(format!("{e}{hint}")));
        }
        Ok(())
    }

    async fn load(&self, hash: &str) -> Result<(Vec<u8>, String), ImageStoreError> {
        let key = self.key_for(hash);
        let obj = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|_| ImageStoreError::NotFound)?;
        let data = obj
            .body
            .collect()
            .await
            .map_err(|e| ImageStoreError::Other(e.to_string()))?;
        let bytes = Vec::from(data.into_bytes().as_ref());
        // ContentType may be absent; sniff instead.
        let mime = infer::get(&bytes)
            .map(|t| t.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        Ok((bytes, mime))
    }

    async fn delete(&self, hash: &str) -> Result<(), ImageStoreError> {
        let key = self.key_for(hash);
        // Best-effort delete: treat not found as success
        let _ = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await;
        Ok(())
    }
}

// ---------------- Filesystem implementation (dev / tests) ----------------
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new() -> Self {
        let mut root = std::env::var("SAFAI_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        root.push("images");
        Self { root }
    }

    fn path_for(&self, hash: &str) -> PathBuf {
        self.root.join(&hash[0..2]).join(hash)
    }
}

impl Default for FsImageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn save(&self, hash: &str, _mime: &str, bytes: &[u8]) -> Result<(), ImageStoreError> {
        let path = self.path_for(hash);
        if path.exists() {
            return Err(ImageStoreError::Duplicate);
        }
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| ImageStoreError::Other(e.to_string()))?;
        }
        std::fs::write(&path, bytes).map_err(|e| ImageStoreError::Other(e.to_string()))
    }

    async fn load(&self, hash: &str) -> Result<(Vec<u8>, String), ImageStoreError> {
        let path = self.path_for(hash);
        let bytes = std::fs::read(&path).map_err(|_| ImageStoreError::NotFound)?;
        let mime = infer::get(&bytes)
            .map(|t| t.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        Ok((bytes, mime))
    }

    async fn delete(&self, hash: &str) -> Result<(), ImageStoreError> {
        let _ = std::fs::remove_file(self.path_for(hash));
        Ok(())
    }
}

/// Factory used by main: S3 when an endpoint is configured, filesystem
/// otherwise.
pub async fn build_image_store() -> Arc<dyn ImageStore> {
    if std::env::var("S3_ENDPOINT").is_ok() {
        match S3ImageStore::new().await {
            Ok(store) => return Arc::new(store),
            Err(e) => panic!("Failed to initialize S3 image store: {e}"),
        }
    }
    info!("S3_ENDPOINT not set; storing images on the local filesystem");
    Arc::new(FsImageStore::new())
}
