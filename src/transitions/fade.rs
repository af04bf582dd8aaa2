use crate::{
    error::Result,
    transitions::traits::{check_pair, frame_from_bytes, Transition},
    video::types::Frame,
};

/// Cross-fade: `(1 - alpha) * from + alpha * to` per channel
pub struct FadeTransition;

impl FadeTransition {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FadeTransition {
    fn default() -> Self {
        Self::new()
    }
}

impl Transition for FadeTransition {
    fn name(&self) -> &str {
        "fade"
    }

    fn description(&self) -> &str {
        "Linear cross-fade from one image to the next"
    }

    fn render(&self, from: &Frame, to: &Frame, alpha: f32) -> Result<Frame> {
        check_pair(self.name(), from, to)?;

        let alpha = alpha.clamp(0.0, 1.0);
        let beta = 1.0 - alpha;

        let data: Vec<u8> = from
            .as_rgb_bytes()
            .iter()
            .zip(to.as_rgb_bytes())
            .map(|(&a, &b)| (beta * a as f32 + alpha * b as f32).round() as u8)
            .collect();

        frame_from_bytes(self.name(), from.width(), from.height(), data)
    }
}
