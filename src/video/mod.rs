//! # Video Module
//!
//! Frames, per-job settings, image loading, frame scheduling and the
//! output-file library.

pub mod library;
pub mod loader;
pub mod scheduler;
pub mod sink;
pub mod types;

pub use library::{OutputLibrary, VideoEntry, VIDEO_MIME_TYPE};
pub use loader::{check_intake, ImageLoader, LoadedImages, SkippedImage};
pub use scheduler::{schedule, FrameInstruction, FramePlan};
pub use sink::{CollectingSink, CountingSink, FrameSink, FrameSource};
pub use types::{Frame, ImageSet, Quality, QualityPreset, Resolution, TransitionType, VideoSettings};
