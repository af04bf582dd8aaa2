use crate::{
    error::{Result, TransitionError},
    video::types::Frame,
};

/// Core trait that all transitions must implement
///
/// A transition is a pure function of two equally sized frames and a blend
/// factor, so one instance can render many frames concurrently.
pub trait Transition: Send + Sync {
    /// Returns the unique name of this transition
    fn name(&self) -> &str;

    /// Returns a human-readable description of this transition
    fn description(&self) -> &str;

    /// Render one intermediate frame
    ///
    /// # Arguments
    ///
    /// * `from` - The outgoing image
    /// * `to` - The incoming image, same size as `from`
    /// * `alpha` - Progress through the transition, 0.0 (all `from`) to 1.0
    fn render(&self, from: &Frame, to: &Frame, alpha: f32) -> Result<Frame>;
}

/// Fail unless both frames share a size
pub(crate) fn check_pair(effect: &str, from: &Frame, to: &Frame) -> Result<()> {
    if from.resolution() != to.resolution() {
        return Err(TransitionError::SizeMismatch {
            effect: effect.to_string(),
            first: from.resolution().to_string(),
            second: to.resolution().to_string(),
        }
        .into());
    }
    Ok(())
}

/// Wrap a finished byte buffer back into a frame
pub(crate) fn frame_from_bytes(effect: &str, width: u32, height: u32, data: Vec<u8>) -> Result<Frame> {
    Frame::from_rgb_bytes(width, height, data).ok_or_else(|| {
        TransitionError::EffectFailed {
            effect: effect.to_string(),
            reason: "output buffer has the wrong length".to_string(),
        }
        .into()
    })
}
