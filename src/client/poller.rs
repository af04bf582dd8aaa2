use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    client::source::StatusSource,
    config::PollingConfig,
    error::PollError,
    job::types::StatusRecord,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Duration,
    /// Consecutive transport failures tolerated before giving up
    pub max_transport_retries: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollOptions {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            timeout: config.timeout(),
            max_transport_retries: config.max_transport_retries,
        }
    }
}

/// Waits for a job to reach a terminal state
///
/// Timing out only stops this poller; the job itself keeps running and
/// may still finish later.
pub struct StatusPoller {
    source: Arc<dyn StatusSource>,
    options: PollOptions,
}

impl StatusPoller {
    pub fn new(source: Arc<dyn StatusSource>, options: PollOptions) -> Self {
        Self { source, options }
    }

    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    /// Poll until the job completes or fails, without progress reporting
    pub async fn wait(&self, job_id: &str) -> Result<StatusRecord, PollError> {
        self.wait_for(job_id, |_, _| {}).await
    }

    /// Poll until the job completes or fails
    ///
    /// Returns the terminal record for both `completed` and `failed` jobs.
    /// `on_progress` runs once per poll that finds the job still processing.
    pub async fn wait_for<F>(&self, job_id: &str, mut on_progress: F) -> Result<StatusRecord, PollError>
    where
        F: FnMut(u8, &str),
    {
        let started = Instant::now();
        let mut transport_failures = 0u32;

        loop {
            let elapsed = started.elapsed();
            if elapsed >= self.options.timeout {
                return Err(PollError::Timeout {
                    job_id: job_id.to_string(),
                    elapsed,
                });
            }

            match self.source.fetch_status(job_id).await {
                Ok(record) if record.status.is_terminal() => {
                    debug!("Job {} finished as {}", job_id, record.status);
                    return Ok(record);
                }
                Ok(record) => {
                    transport_failures = 0;
                    on_progress(record.progress, &record.message);
                }
                Err(PollError::Transport { reason }) => {
                    transport_failures += 1;
                    if transport_failures > self.options.max_transport_retries {
                        return Err(PollError::RetriesExhausted {
                            attempts: transport_failures,
                            last: reason,
                        });
                    }
                    warn!(
                        "Status request for job {} failed ({}/{}): {}",
                        job_id, transport_failures, self.options.max_transport_retries, reason
                    );
                }
                Err(e) => return Err(e),
            }

            let remaining = self.options.timeout.saturating_sub(started.elapsed());
            tokio::time::sleep(self.options.interval.min(remaining)).await;
        }
    }
}
