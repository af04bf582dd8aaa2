use std::sync::Arc;

use rayon::ThreadPool;
use tracing::info;

use crate::{
    config::Config,
    encoder::{build_chain, BackendChain, EncodeParams},
    error::{ReelError, Result},
    job::{
        reporter::ProgressReporter,
        types::{JobId, OutputReference},
    },
    transitions::{Compositor, PlanRenderer, TransitionRegistry},
    video::{
        library::OutputLibrary,
        loader::ImageLoader,
        scheduler::schedule,
        types::{ImageSet, VideoSettings},
    },
};

/// Progress checkpoints, in percent
const PROGRESS_LOADING: u8 = 2;
const PROGRESS_PLANNED: u8 = 10;
const PROGRESS_RENDERED: u8 = 90;
const PROGRESS_FINALIZING: u8 = 95;

/// Progress while image `done` of `total` has been composited and handed
/// to the encoder: linear from 10% to 90%
pub fn rendering_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return PROGRESS_RENDERED;
    }
    let span = (PROGRESS_RENDERED - PROGRESS_PLANNED) as usize;
    PROGRESS_PLANNED + (span * done.min(total) / total) as u8
}

/// Runs one job from image paths to a verified output file
///
/// Everything here is blocking; the orchestrator calls it from the blocking
/// thread pool.
pub struct Synthesizer {
    pool: Arc<ThreadPool>,
    registry: Arc<TransitionRegistry>,
    chain: Arc<BackendChain>,
    library: OutputLibrary,
}

impl Synthesizer {
    pub fn new(
        pool: Arc<ThreadPool>,
        registry: Arc<TransitionRegistry>,
        chain: Arc<BackendChain>,
        library: OutputLibrary,
    ) -> Self {
        Self {
            pool,
            registry,
            chain,
            library,
        }
    }

    /// Worker pool, transitions and encoder chain as configured
    pub fn from_config(config: &Config) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.encoder.worker_threads)
            .thread_name(|i| format!("reelsmith-worker-{}", i))
            .build()
            .map_err(|e| ReelError::generic(format!("failed to build worker pool: {}", e)))?;

        Ok(Self::new(
            Arc::new(pool),
            Arc::new(TransitionRegistry::new()),
            Arc::new(build_chain(config)),
            OutputLibrary::new(&config.storage.output_dir),
        ))
    }

    pub fn library(&self) -> &OutputLibrary {
        &self.library
    }

    pub fn run(
        &self,
        id: &JobId,
        images: &ImageSet,
        settings: &VideoSettings,
        reporter: &ProgressReporter,
    ) -> Result<OutputReference> {
        reporter.stage(PROGRESS_LOADING, "Loading images");
        let loaded = ImageLoader::new(self.pool.clone()).load(images, settings.resolution)?;

        let plan = schedule(loaded.len(), settings)?;
        let transition = self.registry.resolve(settings.transition_type)?;
        let compositor = Compositor::new(transition, self.pool.clone());
        info!(
            "Job {}: {} images at {}, {} frames ({} {} frames) at {} fps",
            id,
            loaded.len(),
            loaded.resolution,
            plan.len(),
            plan.transition_frame_count(),
            compositor.transition_name().unwrap_or("cut"),
            plan.fps()
        );
        reporter.stage(
            PROGRESS_PLANNED,
            &format!("Planned {} frames from {} images", plan.len(), loaded.len()),
        );

        self.library.ensure_exists()?;
        let file_name = OutputLibrary::file_name_for(id.as_str());
        let output = self.library.resolve(&file_name)?;

        let on_image = |done: usize, total: usize| {
            reporter.stage(
                rendering_progress(done, total),
                &format!("Rendering image {} of {}", done, total),
            );
        };
        let renderer =
            PlanRenderer::new(&compositor, &plan, &loaded.frames, loaded.resolution).with_progress(&on_image);
        let params = EncodeParams {
            resolution: loaded.resolution,
            fps: settings.fps,
            quality: settings.quality,
        };

        let encoded = self.chain.encode(&renderer, &params, &output)?;
        reporter.stage(PROGRESS_FINALIZING, "Finalizing video");

        Ok(OutputReference {
            file_name,
            path: encoded.path,
            size_bytes: encoded.size_bytes,
            duration_secs: encoded.duration_secs,
            backend: encoded.backend,
        })
    }
}
