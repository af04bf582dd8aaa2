//! Frame scheduling: turns an image count plus settings into an ordered
//! list of frame instructions.
//!
//! Every image gets `round(duration_per_image * fps)` still frames. When a
//! transition is selected, each adjacent pair gets a fixed run of
//! `round(0.5 * fps)` blended frames regardless of the per-image duration.

use serde::Serialize;

use crate::error::{InputError, Result};
use crate::video::types::{TransitionType, VideoSettings};

/// Length of every transition, in seconds
pub const TRANSITION_SECONDS: f64 = 0.5;

/// One frame to emit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameInstruction {
    /// Image shown (or blended from, for transition frames)
    pub source_index: usize,

    /// Blend factor towards `source_index + 1`; `None` for a plain frame
    pub transition_alpha: Option<f32>,
}

impl FrameInstruction {
    pub fn still(source_index: usize) -> Self {
        Self {
            source_index,
            transition_alpha: None,
        }
    }

    pub fn transition(source_index: usize, alpha: f32) -> Self {
        Self {
            source_index,
            transition_alpha: Some(alpha),
        }
    }

    pub fn is_transition(&self) -> bool {
        self.transition_alpha.is_some()
    }
}

/// Ordered, ephemeral frame plan for one job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FramePlan {
    instructions: Vec<FrameInstruction>,
    image_count: usize,
    fps: u32,
    frames_per_image: usize,
    transition_frames: usize,
    transition_type: TransitionType,
}

impl FramePlan {
    pub fn instructions(&self) -> &[FrameInstruction] {
        &self.instructions
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameInstruction> {
        self.instructions.iter()
    }

    /// Total number of frames
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn image_count(&self) -> usize {
        self.image_count
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn frames_per_image(&self) -> usize {
        self.frames_per_image
    }

    /// Frames per transition; zero when the plan has no transitions
    pub fn transition_frames_per_pair(&self) -> usize {
        self.transition_frames
    }

    pub fn transition_type(&self) -> TransitionType {
        self.transition_type
    }

    pub fn still_frame_count(&self) -> usize {
        self.instructions.iter().filter(|i| !i.is_transition()).count()
    }

    pub fn transition_frame_count(&self) -> usize {
        self.instructions.iter().filter(|i| i.is_transition()).count()
    }

    /// Expected playback length in seconds
    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.fps as f64
    }
}

/// Still frames per image: `round(duration * fps)`, at least one
pub fn frames_per_image(fps: u32, duration_per_image: f64) -> usize {
    ((duration_per_image * fps as f64).round() as usize).max(1)
}

/// Transition frames per adjacent pair: `round(0.5 * fps)`, at least one
pub fn transition_frame_count(fps: u32) -> usize {
    ((TRANSITION_SECONDS * fps as f64).round() as usize).max(1)
}

/// Build the frame plan for `image_count` readable images
pub fn schedule(image_count: usize, settings: &VideoSettings) -> Result<FramePlan> {
    if image_count == 0 {
        return Err(InputError::EmptyImageSet.into());
    }
    settings.validate()?;

    let per_image = frames_per_image(settings.fps, settings.duration_per_image);
    let with_transitions = !settings.transition_type.is_none() && image_count > 1;
    let per_transition = if with_transitions {
        transition_frame_count(settings.fps)
    } else {
        0
    };

    let capacity = image_count * per_image + image_count.saturating_sub(1) * per_transition;
    let mut instructions = Vec::with_capacity(capacity);

    for index in 0..image_count {
        instructions.extend(std::iter::repeat(FrameInstruction::still(index)).take(per_image));

        if with_transitions && index + 1 < image_count {
            instructions.extend((0..per_transition).map(|step| {
                FrameInstruction::transition(index, step as f32 / per_transition as f32)
            }));
        }
    }

    Ok(FramePlan {
        instructions,
        image_count,
        fps: settings.fps,
        frames_per_image: per_image,
        transition_frames: per_transition,
        transition_type: settings.transition_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(fps: u32, duration: f64, transition: TransitionType) -> VideoSettings {
        VideoSettings {
            fps,
            duration_per_image: duration,
            transition_type: transition,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_image_static_video() {
        let plan = schedule(1, &settings(30, 2.0, TransitionType::None)).unwrap();
        assert_eq!(plan.still_frame_count(), 60);
        assert_eq!(plan.transition_frame_count(), 0);
        assert!((plan.duration_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_image_ignores_transition() {
        let plan = schedule(1, &settings(30, 2.0, TransitionType::Fade)).unwrap();
        assert_eq!(plan.len(), 60);
        assert_eq!(plan.transition_frames_per_pair(), 0);
    }

    #[test]
    fn test_three_images_with_fade() {
        let plan = schedule(3, &settings(24, 1.0, TransitionType::Fade)).unwrap();
        assert_eq!(plan.still_frame_count(), 72);
        assert_eq!(plan.transition_frames_per_pair(), 12);
        assert_eq!(plan.transition_frame_count(), 24);
        assert_eq!(plan.len(), 96);
        assert!((plan.duration_secs() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_plain_frame_count_across_ranges() {
        for fps in [1, 7, 24, 25, 30, 60, 120] {
            for duration in [0.5, 0.75, 1.3, 2.0, 10.0] {
                for count in [1, 2, 5] {
                    let plan = schedule(count, &settings(fps, duration, TransitionType::Slide)).unwrap();
                    let expected = (duration * fps as f64).round() as usize;
                    assert_eq!(plan.still_frame_count(), count * expected.max(1));
                    assert_eq!(
                        plan.len(),
                        plan.still_frame_count() + (count - 1) * plan.transition_frames_per_pair()
                    );
                }
            }
        }
    }

    #[test]
    fn test_transition_alpha_and_ordering() {
        let plan = schedule(2, &settings(8, 0.5, TransitionType::Zoom)).unwrap();
        let frames = plan.instructions();

        // 4 stills of image 0, 4 transition frames, 4 stills of image 1
        assert_eq!(frames.len(), 12);
        assert!(frames[..4].iter().all(|f| *f == FrameInstruction::still(0)));
        let alphas: Vec<f32> = frames[4..8].iter().filter_map(|f| f.transition_alpha).collect();
        assert_eq!(alphas, vec![0.0, 0.25, 0.5, 0.75]);
        assert!(frames[4..8].iter().all(|f| f.source_index == 0));
        assert!(frames[8..].iter().all(|f| *f == FrameInstruction::still(1)));
    }

    #[test]
    fn test_minimum_counts_at_one_fps() {
        assert_eq!(frames_per_image(1, 0.5), 1);
        assert_eq!(transition_frame_count(1), 1);
    }

    #[test]
    fn test_schedule_is_deterministic() {
        let s = settings(30, 1.5, TransitionType::Fade);
        assert_eq!(schedule(4, &s).unwrap(), schedule(4, &s).unwrap());
    }

    #[test]
    fn test_empty_and_invalid_rejected() {
        assert!(schedule(0, &VideoSettings::default()).is_err());
        assert!(schedule(2, &settings(0, 1.0, TransitionType::None)).is_err());
    }
}
