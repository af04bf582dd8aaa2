//! # Encoder Module
//!
//! Turns rendered frames into an MP4 container.
//!
//! Two backends are tried for every job:
//!
//! 1. **in-process**: streams raw frames into a writer opened for the first
//!    codec identifier that is available (`libx264`, then `mpeg4`)
//! 2. **external**: writes PNG frames to a scratch directory and runs the
//!    ffmpeg command-line tool over them
//!
//! The stock in-process writer ([`PipeWriterFactory`]) is itself an ffmpeg
//! child fed over stdin, so both backends depend on the same ffmpeg binary
//! and fail together when it is missing. Other [`WriterFactory`]
//! implementations can be plugged into [`InProcessBackend`] to remove that
//! dependency.
//!
//! Every output is checked for size and, when ffprobe is present, duration.

pub mod backend;
pub mod chain;
pub mod command;
pub mod external;
pub mod probe;
pub mod tools;
pub mod writer;

use std::sync::Arc;

use tracing::info;

pub use backend::{EncoderBackend, InProcessBackend};
pub use chain::{BackendChain, EncodedVideo};
pub use command::{FfmpegCommand, FfmpegInput, RateControl};
pub use external::{ExternalBackend, FrameSequenceWriter};
pub use probe::{ContainerProbe, FfprobeProbe, ProbeReport};
pub use tools::ToolPaths;
pub use writer::{EncodeParams, PipeWriterFactory, VideoWriter, WriterFactory};

use crate::config::Config;

/// The standard in-process then external chain, wired from configuration
pub fn build_chain(config: &Config) -> BackendChain {
    let tools = ToolPaths::resolve(
        config.encoder.ffmpeg_path.as_deref(),
        config.encoder.ffprobe_path.as_deref(),
    );
    info!(
        "Encoder tools: ffmpeg={:?} ffprobe={:?}",
        tools.ffmpeg, tools.ffprobe
    );

    let in_process = InProcessBackend::new(
        Arc::new(PipeWriterFactory::new(tools.ffmpeg.clone())),
        config.encoder.codec_candidates.clone(),
    );
    let external = ExternalBackend::new(tools.ffmpeg.clone(), config.storage.scratch_dir.clone());
    let probe = tools
        .ffprobe
        .map(|path| Box::new(FfprobeProbe::new(path)) as Box<dyn ContainerProbe>);

    let backends: Vec<Box<dyn EncoderBackend>> = vec![
        Box::new(in_process) as Box<dyn EncoderBackend>,
        Box::new(external),
    ];
    BackendChain::new(backends)
        .with_probe(probe)
        .with_tolerance_frames(config.encoder.duration_tolerance_frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_order() {
        let chain = build_chain(&Config::default());
        assert_eq!(chain.backend_names(), vec!["in-process", "external"]);
    }
}
