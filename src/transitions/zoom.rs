use crate::{
    error::Result,
    transitions::traits::{check_pair, frame_from_bytes, Transition},
    video::types::Frame,
};

/// Maximum extra magnification reached at `alpha = 1`
pub const ZOOM_AMOUNT: f64 = 0.3;

/// Push-in on the outgoing image before cutting to the next one
///
/// `from` is magnified by `1 + 0.3 * alpha` about the frame centre and
/// center-cropped back to the frame size; anything the scaled image does
/// not cover is left black.
pub struct ZoomTransition;

impl ZoomTransition {
    pub fn new() -> Self {
        Self
    }

    pub fn scale_for(alpha: f32) -> f64 {
        1.0 + ZOOM_AMOUNT * alpha.clamp(0.0, 1.0) as f64
    }
}

impl Default for ZoomTransition {
    fn default() -> Self {
        Self::new()
    }
}

impl Transition for ZoomTransition {
    fn name(&self) -> &str {
        "zoom"
    }

    fn description(&self) -> &str {
        "Gradual zoom into the current image, then a cut to the next"
    }

    fn render(&self, from: &Frame, to: &Frame, alpha: f32) -> Result<Frame> {
        check_pair(self.name(), from, to)?;

        let width = from.width();
        let height = from.height();
        let scale = Self::scale_for(alpha);
        let cx = width as f64 / 2.0;
        let cy = height as f64 / 2.0;

        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            let sy = (y as f64 + 0.5 - cy) / scale + cy - 0.5;
            for x in 0..width {
                let sx = (x as f64 + 0.5 - cx) / scale + cx - 0.5;
                data.extend_from_slice(&sample_bilinear(from, sx, sy));
            }
        }

        frame_from_bytes(self.name(), width, height, data)
    }
}

/// Bilinear sample at a fractional source position; black outside the image
fn sample_bilinear(frame: &Frame, sx: f64, sy: f64) -> [u8; 3] {
    let max_x = (frame.width() - 1) as f64;
    let max_y = (frame.height() - 1) as f64;
    if sx < -0.5 || sy < -0.5 || sx > max_x + 0.5 || sy > max_y + 0.5 {
        return [0, 0, 0];
    }

    let sx = sx.clamp(0.0, max_x);
    let sy = sy.clamp(0.0, max_y);
    let x0 = sx.floor();
    let y0 = sy.floor();
    let fx = sx - x0;
    let fy = sy - y0;
    let x1 = (x0 + 1.0).min(max_x);
    let y1 = (y0 + 1.0).min(max_y);

    let p00 = frame.get_pixel(x0 as u32, y0 as u32);
    let p10 = frame.get_pixel(x1 as u32, y0 as u32);
    let p01 = frame.get_pixel(x0 as u32, y1 as u32);
    let p11 = frame.get_pixel(x1 as u32, y1 as u32);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}
