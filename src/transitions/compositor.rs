use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::debug;

use crate::{
    error::{ReelError, Result, TransitionError},
    transitions::Transition,
    video::{
        scheduler::{FrameInstruction, FramePlan},
        sink::{FrameSink, FrameSource},
        types::{Frame, Resolution},
    },
};

/// Callback invoked as `(images_done, image_count)` once every frame of an
/// image (including its outgoing transition) has reached the sink
pub type ImageProgress<'a> = &'a (dyn Fn(usize, usize) + Sync);

/// A contiguous stretch of the plan that shares a source image
#[derive(Debug, Clone, PartialEq)]
enum Run {
    Still { index: usize, count: usize },
    Blend { index: usize, alphas: Vec<f32> },
}

impl Run {
    fn index(&self) -> usize {
        match self {
            Run::Still { index, .. } | Run::Blend { index, .. } => *index,
        }
    }
}

fn runs(instructions: &[FrameInstruction]) -> Vec<Run> {
    let mut out: Vec<Run> = Vec::new();
    for instruction in instructions {
        let index = instruction.source_index;
        match (instruction.transition_alpha, out.last_mut()) {
            (None, Some(Run::Still { index: last, count })) if *last == index => *count += 1,
            (Some(alpha), Some(Run::Blend { index: last, alphas })) if *last == index => alphas.push(alpha),
            (None, _) => out.push(Run::Still { index, count: 1 }),
            (Some(alpha), _) => out.push(Run::Blend {
                index,
                alphas: vec![alpha],
            }),
        }
    }
    out
}

/// Turns a frame plan plus decoded images into frames
///
/// Blended frames are rendered in parallel batches on the job's worker pool
/// and then handed to the sink strictly in plan order.
pub struct Compositor {
    transition: Option<Box<dyn Transition>>,
    pool: Arc<ThreadPool>,
}

impl Compositor {
    pub fn new(transition: Option<Box<dyn Transition>>, pool: Arc<ThreadPool>) -> Self {
        Self { transition, pool }
    }

    pub fn transition_name(&self) -> Option<&str> {
        self.transition.as_deref().map(|t| t.name())
    }

    fn batch_size(&self) -> usize {
        self.pool.current_num_threads().max(1) * 2
    }

    /// Render the blended frames between two images, one per alpha, in order
    pub fn render_transition(&self, from: &Frame, to: &Frame, alphas: &[f32]) -> Result<Vec<Frame>> {
        let transition = self.transition.as_deref().ok_or_else(|| TransitionError::NotFound {
            name: "none".to_string(),
        })?;

        self.pool.install(|| {
            alphas
                .par_iter()
                .map(|&alpha| transition.render(from, to, alpha))
                .collect()
        })
    }

    /// Emit every frame of `plan` into `sink`
    pub fn render_plan(
        &self,
        plan: &FramePlan,
        images: &[Frame],
        sink: &mut dyn FrameSink,
        progress: Option<ImageProgress<'_>>,
    ) -> Result<()> {
        if plan.image_count() != images.len() {
            return Err(ReelError::generic(format!(
                "frame plan covers {} images but {} were loaded",
                plan.image_count(),
                images.len()
            )));
        }

        let runs = runs(plan.instructions());
        debug!("Rendering {} frames in {} runs", plan.len(), runs.len());

        for (position, run) in runs.iter().enumerate() {
            match run {
                Run::Still { index, count } => sink.write_repeated(&images[*index], *count)?,
                Run::Blend { index, alphas } => {
                    let from = &images[*index];
                    let to = images.get(index + 1).ok_or_else(|| {
                        ReelError::generic(format!("transition after the last image ({})", index))
                    })?;

                    for batch in alphas.chunks(self.batch_size()) {
                        for frame in self.render_transition(from, to, batch)? {
                            sink.write_frame(&frame)?;
                        }
                    }
                }
            }

            let image_finished = runs
                .get(position + 1)
                .map_or(true, |next| next.index() != run.index());
            if image_finished {
                if let Some(report) = progress {
                    report(run.index() + 1, plan.image_count());
                }
            }
        }

        Ok(())
    }
}

/// A plan bound to its images, replayable into any number of sinks
pub struct PlanRenderer<'a> {
    compositor: &'a Compositor,
    plan: &'a FramePlan,
    images: &'a [Frame],
    resolution: Resolution,
    progress: Option<ImageProgress<'a>>,
}

impl<'a> PlanRenderer<'a> {
    pub fn new(compositor: &'a Compositor, plan: &'a FramePlan, images: &'a [Frame], resolution: Resolution) -> Self {
        Self {
            compositor,
            plan,
            images,
            resolution,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ImageProgress<'a>) -> Self {
        self.progress = Some(progress);
        self
    }
}

impl FrameSource for PlanRenderer<'_> {
    fn frame_count(&self) -> usize {
        self.plan.len()
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn fps(&self) -> u32 {
        self.plan.fps()
    }

    fn render_into(&self, sink: &mut dyn FrameSink) -> Result<()> {
        self.compositor.render_plan(self.plan, self.images, sink, self.progress)
    }
}
