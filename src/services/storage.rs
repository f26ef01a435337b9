use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};

/// Binary object storage for generated documents.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `path` and return the public URL of the object.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    async fn remove(&self, path: &str) -> Result<()>;
}

/// Percent-encode each segment of an object path, keeping the slashes.
/// Empty and dot segments are refused.
fn encode_path(path: &str) -> Result<String> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
            return Err(AppError::Storage(format!("invalid object path '{}'", path)));
        }
        segments.push(urlencoding::encode(segment).into_owned());
    }
    Ok(segments.join("/"))
}

/// Files on local disk, served by the HTTP server under `/files`.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(AppError::Storage(format!("invalid object path '{}'", path)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &bytes).await?;
        tracing::debug!("Stored {} bytes at {}", bytes.len(), target.display());
        Ok(format!("{}/files/{}", self.public_base_url, encode_path(path)?))
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// A bucket behind a hosted storage REST API.
pub struct HttpObjectStore {
    client: Client,
    base_url: String,
    bucket: String,
    api_key: Option<String>,
}

impl HttpObjectStore {
    pub fn new(base_url: &str, bucket: &str, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            api_key,
        })
    }

    fn object_url(&self, path: &str) -> Result<String> {
        Ok(format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            self.bucket,
            encode_path(path)?
        ))
    }

    pub fn public_url(&self, path: &str) -> Result<String> {
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.bucket,
            encode_path(path)?
        ))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key).header("apikey", key),
            None => request,
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let size = bytes.len();
        let response = self
            .authorized(self.client.post(self.object_url(path)?))
            .header("content-type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AppError::Storage(format!(
                "upload failed ({}): {}",
                status, error_text
            )));
        }

        tracing::debug!("Uploaded {} bytes to bucket {} at {}", size, self.bucket, path);
        self.public_url(path)
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let response = self
            .authorized(self.client.delete(self.object_url(path)?))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AppError::Storage(format!(
                "delete failed ({}): {}",
                status, error_text
            )));
        }
        Ok(())
    }
}
