//! Structured data extraction via a third-party content-extraction API
//!
//! Jobs are asynchronous: a submit call returns a job id, then status is
//! polled on a fixed interval up to a maximum attempt count.

use crate::config::ExtractConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Structured fields extracted for one tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedTool {
    pub name: String,
    pub tagline: String,
    pub summary: String,
    pub descriptor: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Extraction boundary, mockable for dry runs and tests
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ExtractedTool>;
}

const EXTRACTION_PROMPT: &str = "Extract the following information from this website:\n\
    - name: The product/service/company name\n\
    - tagline: A short catchy phrase or slogan (1-2 sentences)\n\
    - summary: A concise paragraph (maximum 300 words) describing what the tool does, \
    its key features, main benefits, and primary use cases\n\
    - descriptor: A brief 1-2 sentence description of what this tool is (used for search indexing)\n\
    - category: A single broad category that best describes this tool\n\
    - tags: An array of specific use-case tags more granular than the category";

#[derive(Serialize)]
struct SubmitRequest<'a> {
    urls: Vec<&'a str>,
    prompt: &'a str,
    schema: serde_json::Value,
}

#[derive(Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Deserialize)]
struct JobStatusResponse {
    status: String,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ExtractedTool>,
}

/// HTTP client for the extraction API
pub struct ExtractClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl ExtractClient {
    pub fn new(config: &ExtractConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Extract(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_poll_attempts: config.max_poll_attempts,
        })
    }

    fn field_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "tagline": { "type": "string" },
                "summary": { "type": "string" },
                "descriptor": { "type": "string" },
                "category": { "type": "string" },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["name", "tagline", "summary", "descriptor", "category", "tags"]
        })
    }

    /// Submit an extraction job, returning its id
    async fn submit_job(&self, url: &str) -> Result<String> {
        let body = SubmitRequest {
            urls: vec![url],
            prompt: EXTRACTION_PROMPT,
            schema: Self::field_schema(),
        };

        let response = self
            .client
            .post(format!("{}/extract", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Extract(format!(
                "Job submission rejected: HTTP {}",
                status
            )));
        }

        let submitted: SubmitResponse = response.json().await?;
        match submitted.id {
            Some(id) if submitted.success => {
                debug!("Extraction job submitted: {}", id);
                Ok(id)
            }
            _ => Err(Error::Extract(
                "Job submission returned no job id".to_string(),
            )),
        }
    }

    /// Poll a job until it completes, fails, or the attempt budget runs out
    async fn poll_job(&self, job_id: &str) -> Result<ExtractedTool> {
        for attempt in 1..=self.max_poll_attempts {
            let response = self
                .client
                .get(format!("{}/extract/{}", self.api_base, job_id))
                .bearer_auth(&self.api_key)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::Extract(format!(
                    "Status check failed: HTTP {}",
                    status
                )));
            }

            let job: JobStatusResponse = response.json().await?;
            debug!(
                "Job {} status: {} (attempt {}/{})",
                job_id, job.status, attempt, self.max_poll_attempts
            );

            match job.status.as_str() {
                "completed" => {
                    return match job.data {
                        Some(data) if job.success => Ok(data),
                        _ => Err(Error::Extract(
                            "Job completed but returned no data".to_string(),
                        )),
                    };
                }
                "failed" => {
                    return Err(Error::Extract(format!("Extraction job {} failed", job_id)));
                }
                "processing" => {}
                other => warn!("Unknown job status {:?}, continuing to poll", other),
            }

            if attempt < self.max_poll_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Err(Error::ExtractTimeout(self.max_poll_attempts))
    }
}

#[async_trait]
impl Extractor for ExtractClient {
    async fn extract(&self, url: &str) -> Result<ExtractedTool> {
        let job_id = self.submit_job(url).await?;
        self.poll_job(&job_id).await
    }
}

/// Fabricates extraction output without touching the network (dry runs)
pub struct DryRunExtractor;

#[async_trait]
impl Extractor for DryRunExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedTool> {
        Ok(ExtractedTool {
            name: "Sample Tool".to_string(),
            tagline: "Sample tagline for validation".to_string(),
            summary: format!("Fabricated summary for {} produced in dry-run mode.", url),
            descriptor: "A sample tool for pipeline validation".to_string(),
            category: Some("Sample".to_string()),
            tags: vec!["sample".to_string(), "dry-run".to_string()],
        })
    }
}
