use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{InputError, JobError, Result},
    video::types::VideoSettings,
};

/// Opaque job identity, either supplied by the caller or a random UUID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ids name output files and appear in status URLs, so they must be a
    /// single plain path segment
    pub fn check_safe(&self) -> Result<()> {
        let id = self.0.as_str();
        if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\', '\0']) {
            return Err(InputError::InvalidSettings {
                key: "jobId".to_string(),
                value: id.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a finished job's video lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputReference {
    /// File name inside the output directory; this is what clients see
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub duration_secs: f64,
    pub backend: String,
}

/// Server-side record of one synthesis job
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub output: Option<OutputReference>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub settings: VideoSettings,
    pub image_count: usize,
}

impl JobRecord {
    pub fn new(id: JobId, settings: VideoSettings, image_count: usize) -> Self {
        Self {
            id,
            status: JobStatus::Processing,
            progress: 0,
            message: "Starting video creation".to_string(),
            output: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
            settings,
            image_count,
        }
    }

    fn ensure_processing(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(JobError::Terminal {
                id: self.id.to_string(),
                status: self.status.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Move progress forward; values below the current one are ignored
    pub fn update_progress(&mut self, progress: u8, message: &str) -> Result<()> {
        self.ensure_processing()?;
        self.progress = self.progress.max(progress.min(100));
        self.message = message.to_string();
        Ok(())
    }

    pub fn complete(&mut self, output: OutputReference) -> Result<()> {
        self.ensure_processing()?;
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.message = "Video created successfully".to_string();
        self.output = Some(output);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Progress stays at the last reported value
    pub fn fail(&mut self, error: &str) -> Result<()> {
        self.ensure_processing()?;
        self.status = JobStatus::Failed;
        self.message = "Video creation failed".to_string();
        self.error = Some(error.to_string());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn status_record(&self) -> StatusRecord {
        StatusRecord::from(self)
    }
}

/// The wire shape of a job's status, as served to pollers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    #[serde(default)]
    pub video_reference: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&JobRecord> for StatusRecord {
    fn from(record: &JobRecord) -> Self {
        Self {
            job_id: record.id.to_string(),
            status: record.status,
            progress: record.progress,
            message: record.message.clone(),
            video_reference: record.output.as_ref().map(|o| o.file_name.clone()),
            error: record.error.clone(),
            created_at: record.created_at,
            completed_at: record.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output() -> OutputReference {
        OutputReference {
            file_name: "abc.mp4".to_string(),
            path: PathBuf::from("/videos/abc.mp4"),
            size_bytes: 10,
            duration_secs: 2.0,
            backend: "external".to_string(),
        }
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut record = JobRecord::new(JobId::from("abc"), VideoSettings::default(), 1);
        record.update_progress(40, "Rendering").unwrap();
        record.update_progress(20, "Rendering again").unwrap();
        assert_eq!(record.progress, 40);
        assert_eq!(record.message, "Rendering again");

        record.update_progress(250, "Overshoot").unwrap();
        assert_eq!(record.progress, 100);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut record = JobRecord::new(JobId::from("abc"), VideoSettings::default(), 1);
        record.update_progress(30, "Rendering").unwrap();
        record.fail("boom").unwrap();

        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.progress, 30);
        assert!(record.completed_at.is_some());
        assert!(record.update_progress(50, "late").is_err());
        assert!(record.complete(output()).is_err());
        assert!(record.fail("again").is_err());
    }

    #[test]
    fn test_status_record_shape() {
        let mut record = JobRecord::new(JobId::from("abc"), VideoSettings::default(), 3);
        record.complete(output()).unwrap();

        let json = serde_json::to_value(record.status_record()).unwrap();
        assert_eq!(json["jobId"], "abc");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["progress"], 100);
        assert_eq!(json["videoReference"], "abc.mp4");
        assert!(json["error"].is_null());
        assert!(json["createdAt"].is_string());
        assert!(json["completedAt"].is_string());
    }

    #[test]
    fn test_unsafe_ids_rejected() {
        for id in ["", "../victim", ".hidden", "a/b", "a\\b"] {
            assert!(JobId::from(id).check_safe().is_err(), "{:?} accepted", id);
        }
        assert!(JobId::from("job-42_final").check_safe().is_ok());
        assert!(JobId::generate().check_safe().is_ok());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(JobId::generate(), JobId::generate());
    }
}
