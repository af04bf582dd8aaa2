use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::{
    encoder::{
        backend::EncoderBackend,
        command::{frame_file_name, FfmpegCommand, FfmpegInput, FRAME_PATTERN},
        writer::EncodeParams,
    },
    error::{truncate_diagnostic, EncodingError, ReelError, Result},
    video::{
        sink::{FrameSink, FrameSource},
        types::Frame,
    },
};

const BACKEND: &str = "external";

/// Writes each frame as a numbered PNG in a directory
///
/// Repeated frames are hard-linked to the first copy when the filesystem
/// allows it.
pub struct FrameSequenceWriter {
    dir: PathBuf,
    next_index: usize,
}

impl FrameSequenceWriter {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            next_index: 0,
        }
    }

    pub fn frames_written(&self) -> usize {
        self.next_index
    }

    fn next_path(&mut self) -> PathBuf {
        let path = self.dir.join(frame_file_name(self.next_index));
        self.next_index += 1;
        path
    }
}

impl FrameSink for FrameSequenceWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let path = self.next_path();
        frame.save_png(&path).map_err(|e| {
            EncodingError::backend(BACKEND, format!("failed to write intermediate frame: {}", e))
        })?;
        Ok(())
    }

    fn write_repeated(&mut self, frame: &Frame, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }

        let first = self.dir.join(frame_file_name(self.next_index));
        self.write_frame(frame)?;

        for _ in 1..count {
            let path = self.next_path();
            if std::fs::hard_link(&first, &path).is_err() {
                std::fs::copy(&first, &path)?;
            }
        }
        Ok(())
    }
}

/// Delegates encoding to the ffmpeg command-line tool
///
/// Frames are flushed to a job-private scratch directory as lossless PNGs,
/// then encoded with H.264. The scratch directory is removed however the
/// attempt ends.
pub struct ExternalBackend {
    ffmpeg: Option<PathBuf>,
    scratch_root: Option<PathBuf>,
}

impl ExternalBackend {
    pub fn new(ffmpeg: Option<PathBuf>, scratch_root: Option<PathBuf>) -> Self {
        Self { ffmpeg, scratch_root }
    }

    fn create_scratch(&self) -> Result<TempDir> {
        let attempt = || -> std::io::Result<TempDir> {
            let mut builder = tempfile::Builder::new();
            builder.prefix("reelsmith-frames-");
            match &self.scratch_root {
                Some(root) => {
                    std::fs::create_dir_all(root)?;
                    builder.tempdir_in(root)
                }
                None => builder.tempdir(),
            }
        };

        attempt().or_else(|first| {
            debug!("Scratch directory creation failed ({}), retrying once", first);
            attempt().map_err(|e| {
                ReelError::from(EncodingError::TransientIo {
                    operation: "scratch directory creation".to_string(),
                    reason: e.to_string(),
                })
            })
        })
    }

    fn run(&self, ffmpeg: &Path, scratch: &Path, params: &EncodeParams, output: &Path) -> Result<()> {
        let command = FfmpegCommand::new(
            ffmpeg,
            FfmpegInput::FrameSequence {
                pattern: scratch.join(FRAME_PATTERN),
            },
            params.fps,
            output,
        )
        .codec("libx264", params.quality)
        .scale(params.resolution);

        debug!("Running {} {:?}", ffmpeg.display(), command.args());

        let result = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| EncodingError::TransientIo {
                operation: "ffmpeg spawn".to_string(),
                reason: e.to_string(),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            warn!("ffmpeg exited with {}: {}", result.status, stderr.trim());
            return Err(EncodingError::backend(
                BACKEND,
                format!("ffmpeg exited with {}: {}", result.status, truncate_diagnostic(&stderr, 160)),
            )
            .into());
        }

        let size = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(EncodingError::backend(BACKEND, "ffmpeg produced no output").into());
        }
        Ok(())
    }
}

impl EncoderBackend for ExternalBackend {
    fn name(&self) -> &str {
        BACKEND
    }

    fn encode(&self, source: &dyn FrameSource, params: &EncodeParams, output: &Path) -> Result<()> {
        let ffmpeg = self
            .ffmpeg
            .as_deref()
            .ok_or_else(|| EncodingError::backend(BACKEND, "ffmpeg not found"))?;

        let scratch = self.create_scratch()?;
        info!(
            "Writing {} intermediate frames to {}",
            source.frame_count(),
            scratch.path().display()
        );

        let result = (|| -> Result<()> {
            let mut frames = FrameSequenceWriter::new(scratch.path());
            source.render_into(&mut frames)?;
            debug!("Wrote {} frames", frames.frames_written());
            self.run(ffmpeg, scratch.path(), params, output)
        })();

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!("Failed to remove scratch directory {}: {}", scratch_path.display(), e);
        }

        result
    }
}
