use crate::{
    error::Result,
    transitions::traits::{check_pair, frame_from_bytes, Transition},
    video::types::Frame,
};

/// Horizontal push: the outgoing image slides off to the left while the
/// incoming one slides in from the right
///
/// With `offset = floor(alpha * width)`, columns `[0, width - offset)` show
/// `from` shifted left by `offset`, and columns `[width - offset, width)`
/// show the first `offset` columns of `to`.
pub struct SlideTransition;

impl SlideTransition {
    pub fn new() -> Self {
        Self
    }

    fn offset(width: u32, alpha: f32) -> u32 {
        ((alpha.clamp(0.0, 1.0) * width as f32).floor() as u32).min(width)
    }
}

impl Default for SlideTransition {
    fn default() -> Self {
        Self::new()
    }
}

impl Transition for SlideTransition {
    fn name(&self) -> &str {
        "slide"
    }

    fn description(&self) -> &str {
        "Horizontal wipe pushing the current image out to the left"
    }

    fn render(&self, from: &Frame, to: &Frame, alpha: f32) -> Result<Frame> {
        check_pair(self.name(), from, to)?;

        let width = from.width() as usize;
        let height = from.height() as usize;
        let offset = Self::offset(from.width(), alpha) as usize;
        let cut = width - offset;
        let stride = width * 3;

        let src_a = from.as_rgb_bytes();
        let src_b = to.as_rgb_bytes();
        let mut data = vec![0u8; stride * height];

        for (y, row) in data.chunks_exact_mut(stride).enumerate() {
            let row_a = &src_a[y * stride..(y + 1) * stride];
            let row_b = &src_b[y * stride..(y + 1) * stride];

            row[..cut * 3].copy_from_slice(&row_a[offset * 3..]);
            row[cut * 3..].copy_from_slice(&row_b[..offset * 3]);
        }

        frame_from_bytes(self.name(), from.width(), from.height(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frame whose red channel encodes the column index
    fn columns(width: u32, height: u32, green: u8) -> Frame {
        let mut frame = Frame::new_black(width, height);
        for y in 0..height {
            for x in 0..width {
                frame.set_pixel(x, y, [x as u8, green, 0]);
            }
        }
        frame
    }

    #[test]
    fn test_alpha_zero_is_outgoing_image() {
        let a = columns(10, 3, 1);
        let b = columns(10, 3, 2);
        assert_eq!(SlideTransition::new().render(&a, &b, 0.0).unwrap(), a);
    }

    #[test]
    fn test_cut_line_position() {
        let a = columns(10, 3, 1);
        let b = columns(10, 3, 2);
        let frame = SlideTransition::new().render(&a, &b, 0.3).unwrap();

        // offset = 3: columns 0..7 come from `a` shifted by 3
        for x in 0..7 {
            assert_eq!(frame.get_pixel(x, 1), [(x + 3) as u8, 1, 0]);
        }
        // columns 7..10 are the first three columns of `b`
        for x in 7..10 {
            assert_eq!(frame.get_pixel(x, 1), [(x - 7) as u8, 2, 0]);
        }
    }

    #[test]
    fn test_alpha_one_is_incoming_image() {
        let a = columns(6, 2, 1);
        let b = columns(6, 2, 2);
        assert_eq!(SlideTransition::new().render(&a, &b, 1.0).unwrap(), b);
    }
}
