use crate::error::Result;
use crate::video::types::{Frame, Resolution};

/// Destination for frames in temporal order
pub trait FrameSink {
    /// Append one frame
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Append the same frame `count` times
    ///
    /// Sinks that can repeat a frame cheaply (hard links, duplicated
    /// buffers) override this.
    fn write_repeated(&mut self, frame: &Frame, count: usize) -> Result<()> {
        for _ in 0..count {
            self.write_frame(frame)?;
        }
        Ok(())
    }
}

/// A replayable producer of frames
///
/// Encoder backends may fail halfway through, so a source must be able to
/// render its whole sequence again into a fresh sink.
pub trait FrameSource {
    fn frame_count(&self) -> usize;

    fn resolution(&self) -> Resolution;

    fn fps(&self) -> u32;

    /// Render every frame, in order, into `sink`
    fn render_into(&self, sink: &mut dyn FrameSink) -> Result<()>;

    fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.fps().max(1) as f64
    }
}

/// Sink that keeps every frame in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub frames: Vec<Frame>,
}

impl FrameSink for CollectingSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

/// Sink that only counts
#[derive(Debug, Default)]
pub struct CountingSink {
    pub count: usize,
}

impl FrameSink for CountingSink {
    fn write_frame(&mut self, _frame: &Frame) -> Result<()> {
        self.count += 1;
        Ok(())
    }

    fn write_repeated(&mut self, _frame: &Frame, count: usize) -> Result<()> {
        self.count += count;
        Ok(())
    }
}
