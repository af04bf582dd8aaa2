use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::{
    error::{PollError, ReelError, Result},
    job::types::StatusRecord,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can report a job's current status
///
/// `Transport` errors are treated as retryable by the poller; every other
/// error ends polling.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: &str) -> std::result::Result<StatusRecord, PollError>;
}

/// Status source backed by a remote `GET {base}/status/{job_id}` endpoint
pub struct HttpStatusSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatusSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ReelError::generic(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn status_url(&self, job_id: &str) -> String {
        format!("{}/status/{}", self.base_url, job_id)
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch_status(&self, job_id: &str) -> std::result::Result<StatusRecord, PollError> {
        let url = self.status_url(job_id);
        debug!("GET {}", url);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PollError::Transport { reason: e.to_string() })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PollError::NotFound {
                job_id: job_id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(PollError::Transport {
                reason: format!("server returned {}", status),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| PollError::Transport { reason: e.to_string() })?;
        serde_json::from_slice(&body).map_err(|e| PollError::Decode { reason: e.to_string() })
    }
}
