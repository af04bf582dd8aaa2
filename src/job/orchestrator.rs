use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{
    client::source::StatusSource,
    config::Config,
    error::{JobError, PollError, Result},
    job::{
        pipeline::Synthesizer,
        reporter::ProgressReporter,
        store::{JobStore, MemoryJobStore},
        types::{JobId, JobRecord, StatusRecord},
    },
    video::types::{ImageSet, VideoSettings},
};

/// A request to turn images into a video
#[derive(Debug, Clone, Default)]
pub struct SynthesisRequest {
    /// Caller-chosen id; a UUID is generated when absent
    pub job_id: Option<JobId>,
    pub images: Vec<PathBuf>,
    pub settings: VideoSettings,
}

/// Handle returned by [`Orchestrator::submit`]
pub struct JobTicket {
    id: JobId,
    updates: watch::Receiver<JobRecord>,
}

impl JobTicket {
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Latest published record
    pub fn current(&self) -> JobRecord {
        self.updates.borrow().clone()
    }

    /// A second receiver for the same job's updates
    pub fn subscribe(&self) -> watch::Receiver<JobRecord> {
        self.updates.clone()
    }

    /// Wait until the job is completed or failed
    pub async fn wait(mut self) -> JobRecord {
        loop {
            {
                let record = self.updates.borrow_and_update();
                if record.status.is_terminal() {
                    return record.clone();
                }
            }
            if self.updates.changed().await.is_err() {
                return self.updates.borrow().clone();
            }
        }
    }
}

/// Accepts synthesis requests and runs each as its own background task
///
/// Jobs never block one another. The orchestrator keeps the task handle of
/// every job it started so failures are always observed.
pub struct Orchestrator {
    store: Arc<dyn JobStore>,
    synthesizer: Arc<Synthesizer>,
    tasks: DashMap<JobId, JoinHandle<()>>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn JobStore>, synthesizer: Arc<Synthesizer>) -> Self {
        Self {
            store,
            synthesizer,
            tasks: DashMap::new(),
        }
    }

    /// In-memory store plus the configured synthesizer
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Arc::new(MemoryJobStore::new()),
            Arc::new(Synthesizer::from_config(config)?),
        ))
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn synthesizer(&self) -> &Arc<Synthesizer> {
        &self.synthesizer
    }

    /// Validate and start a job
    ///
    /// Input problems are returned here and no job is created. Anything
    /// that goes wrong later ends up in the job's `failed` state instead.
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, request: SynthesisRequest) -> Result<JobTicket> {
        let images = ImageSet::new(request.images)?;
        request.settings.validate()?;

        let id = request.job_id.unwrap_or_else(JobId::generate);
        id.check_safe()?;
        let record = JobRecord::new(id.clone(), request.settings.clone(), images.len());
        self.store.create(record.clone())?;

        let (tx, rx) = watch::channel(record);
        let reporter = Arc::new(ProgressReporter::new(id.clone(), self.store.clone(), tx));
        let synthesizer = self.synthesizer.clone();
        let settings = request.settings;

        info!("Job {} accepted: {} images, {:?}", id, images.len(), settings);

        let job_id = id.clone();
        let handle = tokio::spawn(async move {
            let worker = reporter.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                let id = worker.job_id();
                match synthesizer.run(id, &images, &settings, &worker) {
                    Ok(output) => {
                        info!("Job {} completed: {}", id, output.file_name);
                        if let Err(e) = worker.complete(output) {
                            warn!("Job {} could not be marked completed: {}", id, e);
                        }
                    }
                    Err(e) => {
                        error!("Job {} failed: {}", id, e);
                        if let Err(e) = worker.fail(&e.user_message()) {
                            warn!("Job {} could not be marked failed: {}", id, e);
                        }
                    }
                }
            })
            .await;

            if let Err(join_error) = outcome {
                let failure = JobError::Panicked {
                    id: job_id.to_string(),
                    reason: join_error.to_string(),
                };
                error!("{}", failure);
                if let Err(e) = reporter.fail("Video creation stopped unexpectedly") {
                    warn!("Job {} could not be marked failed: {}", job_id, e);
                }
            }
        });

        self.prune_finished();
        self.tasks.insert(id.clone(), handle);

        Ok(JobTicket { id, updates: rx })
    }

    pub fn status(&self, id: &JobId) -> Option<StatusRecord> {
        self.store.get(id).map(|r| r.status_record())
    }

    /// Number of jobs whose background task has not finished yet
    pub fn running(&self) -> usize {
        self.tasks.iter().filter(|t| !t.value().is_finished()).count()
    }

    fn prune_finished(&self) {
        self.tasks.retain(|_, handle| !handle.is_finished());
    }

    /// Wait for every started job's task to end
    pub async fn join_all(&self) {
        let ids: Vec<JobId> = self.tasks.iter().map(|t| t.key().clone()).collect();
        for id in ids {
            if let Some((_, handle)) = self.tasks.remove(&id) {
                if let Err(e) = handle.await {
                    warn!("Supervisor for job {} ended abnormally: {}", id, e);
                }
            }
        }
    }
}

#[async_trait]
impl StatusSource for Orchestrator {
    async fn fetch_status(&self, job_id: &str) -> std::result::Result<StatusRecord, PollError> {
        self.status(&JobId::from(job_id)).ok_or_else(|| PollError::NotFound {
            job_id: job_id.to_string(),
        })
    }
}
