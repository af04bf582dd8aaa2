use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    error::Result,
    job::{
        store::JobStore,
        types::{JobId, JobRecord, OutputReference},
    },
};

/// The one writer of a job's record
///
/// Every change goes through the store, and the resulting record is
/// published to anyone holding a receiver for this job.
pub struct ProgressReporter {
    id: JobId,
    store: Arc<dyn JobStore>,
    updates: watch::Sender<JobRecord>,
}

impl ProgressReporter {
    pub fn new(id: JobId, store: Arc<dyn JobStore>, updates: watch::Sender<JobRecord>) -> Self {
        Self { id, store, updates }
    }

    pub fn job_id(&self) -> &JobId {
        &self.id
    }

    fn apply(&self, change: &mut dyn FnMut(&mut JobRecord) -> Result<()>) -> Result<JobRecord> {
        let record = self.store.update(&self.id, change)?;
        self.updates.send_replace(record.clone());
        Ok(record)
    }

    /// Report a step; progress below the current value is ignored
    pub fn stage(&self, progress: u8, message: &str) {
        debug!("Job {}: {}% {}", self.id, progress, message);
        if let Err(e) = self.apply(&mut |r| r.update_progress(progress, message)) {
            warn!("Dropped progress update for job {}: {}", self.id, e);
        }
    }

    pub fn complete(&self, output: OutputReference) -> Result<JobRecord> {
        let mut output = Some(output);
        self.apply(&mut |r| match output.take() {
            Some(output) => r.complete(output),
            None => Ok(()),
        })
    }

    pub fn fail(&self, error: &str) -> Result<JobRecord> {
        self.apply(&mut |r| r.fail(error))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::job::store::MemoryJobStore;
    use crate::job::types::JobStatus;
    use crate::video::types::VideoSettings;

    fn setup() -> (ProgressReporter, watch::Receiver<JobRecord>, Arc<MemoryJobStore>) {
        let store = Arc::new(MemoryJobStore::new());
        let record = JobRecord::new(JobId::from("job"), VideoSettings::default(), 1);
        store.create(record.clone()).unwrap();
        let (tx, rx) = watch::channel(record);
        (ProgressReporter::new(JobId::from("job"), store.clone(), tx), rx, store)
    }

    #[test]
    fn test_stage_publishes() {
        let (reporter, rx, store) = setup();
        assert_eq!(reporter.job_id().as_str(), "job");
        reporter.stage(25, "Rendering image 1 of 4");

        assert_eq!(rx.borrow().progress, 25);
        assert_eq!(store.get(&JobId::from("job")).unwrap().progress, 25);
    }

    #[test]
    fn test_complete_then_stage_is_dropped() {
        let (reporter, rx, _store) = setup();
        reporter
            .complete(OutputReference {
                file_name: "job.mp4".to_string(),
                path: PathBuf::from("job.mp4"),
                size_bytes: 1,
                duration_secs: 1.0,
                backend: "in-process".to_string(),
            })
            .unwrap();
        reporter.stage(50, "late");

        let latest = rx.borrow().clone();
        assert_eq!(latest.status, JobStatus::Completed);
        assert_eq!(latest.progress, 100);
        assert!(reporter.fail("late failure").is_err());
    }
}
