use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::{
    error::{JobError, Result},
    job::types::{JobId, JobRecord},
};

/// Storage for job records
///
/// Implementations must apply `update` atomically per job and refuse to
/// change a record that has reached a terminal state.
pub trait JobStore: Send + Sync {
    /// Insert a new record; fails if the id is taken
    fn create(&self, record: JobRecord) -> Result<()>;

    fn get(&self, id: &JobId) -> Option<JobRecord>;

    /// Apply `change` to the stored record and return the result
    fn update(&self, id: &JobId, change: &mut dyn FnMut(&mut JobRecord) -> Result<()>) -> Result<JobRecord>;

    fn list(&self) -> Vec<JobRecord>;
}

/// In-memory store with per-shard locking
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: DashMap<JobId, JobRecord>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl JobStore for MemoryJobStore {
    fn create(&self, record: JobRecord) -> Result<()> {
        match self.jobs.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(JobError::AlreadyExists {
                id: record.id.to_string(),
            }
            .into()),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.jobs.get(id).map(|r| r.value().clone())
    }

    fn update(&self, id: &JobId, change: &mut dyn FnMut(&mut JobRecord) -> Result<()>) -> Result<JobRecord> {
        let mut entry = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound { id: id.to_string() })?;

        if entry.status.is_terminal() {
            return Err(JobError::Terminal {
                id: id.to_string(),
                status: entry.status.to_string(),
            }
            .into());
        }

        // Work on a copy so a failed change leaves the record untouched
        let mut next = entry.value().clone();
        change(&mut next)?;
        next.progress = next.progress.max(entry.progress);

        *entry.value_mut() = next.clone();
        Ok(next)
    }

    fn list(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self.jobs.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::job::types::JobStatus;
    use crate::video::types::VideoSettings;

    fn record(id: &str) -> JobRecord {
        JobRecord::new(JobId::from(id), VideoSettings::default(), 2)
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let store = MemoryJobStore::new();
        store.create(record("a")).unwrap();
        assert!(store.create(record("a")).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_applies_atomically() {
        let store = MemoryJobStore::new();
        store.create(record("a")).unwrap();

        let updated = store
            .update(&JobId::from("a"), &mut |r| r.update_progress(30, "Rendering"))
            .unwrap();
        assert_eq!(updated.progress, 30);
        assert_eq!(store.get(&JobId::from("a")).unwrap().message, "Rendering");
    }

    #[test]
    fn test_failed_change_leaves_record() {
        let store = MemoryJobStore::new();
        store.create(record("a")).unwrap();
        store.update(&JobId::from("a"), &mut |r| r.fail("boom")).unwrap();

        let result = store.update(&JobId::from("a"), &mut |r| r.update_progress(90, "late"));
        assert!(result.is_err());

        let stored = store.get(&JobId::from("a")).unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.progress, 0);
    }

    #[test]
    fn test_store_clamps_regressions() {
        let store = MemoryJobStore::new();
        store.create(record("a")).unwrap();
        store.update(&JobId::from("a"), &mut |r| r.update_progress(60, "x")).unwrap();

        // A change that rewrites progress directly still cannot go backwards
        let updated = store
            .update(&JobId::from("a"), &mut |r| {
                r.progress = 10;
                Ok(())
            })
            .unwrap();
        assert_eq!(updated.progress, 60);
    }

    #[test]
    fn test_unknown_job() {
        let store = MemoryJobStore::new();
        assert!(store.get(&JobId::from("nope")).is_none());
        assert!(store.update(&JobId::from("nope"), &mut |_| Ok(())).is_err());
    }

    #[test]
    fn test_concurrent_writers_on_separate_jobs() {
        let store = Arc::new(MemoryJobStore::new());
        for i in 0..8 {
            store.create(record(&format!("job-{}", i))).unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let id = JobId::from(format!("job-{}", i));
                    for p in 0..=100u8 {
                        store.update(&id, &mut |r| r.update_progress(p, "tick")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(store.list().iter().all(|r| r.progress == 100));
    }
}
