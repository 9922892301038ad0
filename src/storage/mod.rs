//! Object storage client for captured screenshots
//!
//! Uploads follow a two-step flow: request a short-lived upload URL, then
//! send the file bytes to it. The returned storage id is recorded on the
//! tool as a `/image?id={id}` asset path, which the normalization layer in
//! [`crate::assets`] later rewrites into a public URL.

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Upload boundary, mockable for dry runs and tests
#[async_trait]
pub trait AssetUploader: Send + Sync {
    /// Upload a screenshot file, returning its asset path (`/image?id={id}`)
    async fn upload(&self, file_path: &Path) -> Result<String>;
}

#[derive(Deserialize)]
struct UploadUrlResponse {
    #[serde(rename = "uploadUrl")]
    upload_url: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(rename = "storageId")]
    storage_id: String,
}

/// HTTP client for the storage API
pub struct StorageClient {
    client: reqwest::Client,
    base_url: String,
}

impl StorageClient {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Upload(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Request a short-lived URL to upload one object to
    async fn request_upload_url(&self) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/upload-url", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upload(format!(
                "Upload URL request failed: HTTP {}",
                status
            )));
        }

        let body: UploadUrlResponse = response.json().await?;
        Ok(body.upload_url)
    }
}

#[async_trait]
impl AssetUploader for StorageClient {
    async fn upload(&self, file_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(file_path).await?;
        let upload_url = self.request_upload_url().await?;

        debug!(
            "Uploading {} ({} bytes)",
            file_path.display(),
            bytes.len()
        );

        let response = self
            .client
            .post(&upload_url)
            .header("Content-Type", "image/png")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upload(format!("Upload failed: HTTP {}", status)));
        }

        let body: UploadResponse = response.json().await?;
        debug!("Uploaded as storage id {}", body.storage_id);
        Ok(format!("/image?id={}", body.storage_id))
    }
}

/// Fabricates an asset path without uploading anything (dry runs)
pub struct DryRunUploader;

#[async_trait]
impl AssetUploader for DryRunUploader {
    async fn upload(&self, file_path: &Path) -> Result<String> {
        let stem = file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("screenshot");
        Ok(format!("/image?id=dry-run-{}", stem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_upload_two_step_flow() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload-url"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "uploadUrl": format!("{}/put/obj-1", server.uri())
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/put/obj-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "storageId": "k42abc" })),
            )
            .mount(&server)
            .await;

        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("shot.png");
        std::fs::write(&file, b"png bytes").unwrap();

        let config = StorageConfig {
            base_url: server.uri(),
        };
        let client = StorageClient::new(&config).unwrap();
        let asset_path = client.upload(&file).await.unwrap();
        assert_eq!(asset_path, "/image?id=k42abc");
    }

    #[tokio::test]
    async fn test_upload_url_request_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload-url"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("shot.png");
        std::fs::write(&file, b"png bytes").unwrap();

        let config = StorageConfig {
            base_url: server.uri(),
        };
        let client = StorageClient::new(&config).unwrap();
        let err = client.upload(&file).await.unwrap_err();
        assert!(matches!(err, Error::Upload(_)));
    }
}
