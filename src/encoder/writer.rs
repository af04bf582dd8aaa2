use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Stdio};
use std::sync::OnceLock;
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::{
    encoder::{
        command::{FfmpegCommand, FfmpegInput},
        tools::list_video_encoders,
    },
    error::{truncate_diagnostic, EncodingError, Result},
    video::{
        sink::FrameSink,
        types::{Frame, Quality, Resolution},
    },
};

const BACKEND: &str = "in-process";

/// Parameters shared by every writer opened for one job
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeParams {
    pub resolution: Resolution,
    pub fps: u32,
    pub quality: Quality,
}

/// An open video container accepting frames in temporal order
pub trait VideoWriter: FrameSink + Send {
    fn codec(&self) -> &str;

    fn as_sink(&mut self) -> &mut dyn FrameSink;

    /// Flush and close the container
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Opens writers for a codec identifier
///
/// `try_open` is the capability probe: an `Err` means this codec is not
/// usable here and the caller should try the next one.
pub trait WriterFactory: Send + Sync {
    fn name(&self) -> &str;

    fn try_open(&self, codec: &str, params: &EncodeParams, output: &Path) -> Result<Box<dyn VideoWriter>>;
}

/// Writer factory that streams raw RGB24 frames into an ffmpeg child process
pub struct PipeWriterFactory {
    ffmpeg: Option<PathBuf>,
    encoders: OnceLock<Vec<String>>,
}

impl PipeWriterFactory {
    pub fn new(ffmpeg: Option<PathBuf>) -> Self {
        Self {
            ffmpeg,
            encoders: OnceLock::new(),
        }
    }

    fn available_encoders(&self, ffmpeg: &Path) -> &[String] {
        self.encoders.get_or_init(|| match list_video_encoders(ffmpeg) {
            Ok(encoders) => {
                debug!("ffmpeg reports {} video encoders", encoders.len());
                encoders
            }
            Err(e) => {
                warn!("Could not list ffmpeg encoders: {}", e);
                Vec::new()
            }
        })
    }
}

impl WriterFactory for PipeWriterFactory {
    fn name(&self) -> &str {
        "ffmpeg-pipe"
    }

    fn try_open(&self, codec: &str, params: &EncodeParams, output: &Path) -> Result<Box<dyn VideoWriter>> {
        let ffmpeg = self
            .ffmpeg
            .as_deref()
            .ok_or_else(|| EncodingError::backend(BACKEND, "ffmpeg not found"))?;

        if !self.available_encoders(ffmpeg).iter().any(|e| e == codec) {
            return Err(EncodingError::backend(BACKEND, format!("codec {} is not available", codec)).into());
        }

        let command = FfmpegCommand::new(
            ffmpeg,
            FfmpegInput::RawRgbPipe {
                resolution: params.resolution,
            },
            params.fps,
            output,
        )
        .codec(codec, params.quality);

        let mut child = command
            .to_command()
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EncodingError::backend(BACKEND, format!("failed to spawn ffmpeg: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EncodingError::backend(BACKEND, "ffmpeg stdin unavailable"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| EncodingError::backend(BACKEND, "ffmpeg stderr unavailable"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes).map(|_| bytes)
        });

        Ok(Box::new(PipeWriter {
            codec: codec.to_string(),
            resolution: params.resolution,
            child: Some(child),
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
        }))
    }
}

struct PipeWriter {
    codec: String,
    resolution: Resolution,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl PipeWriter {
    fn collect_stderr(&mut self) -> String {
        match self.stderr_drain.take().map(|handle| handle.join()) {
            Some(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
            _ => String::new(),
        }
    }
}

impl FrameSink for PipeWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.resolution() != self.resolution {
            return Err(EncodingError::backend(
                BACKEND,
                format!("frame is {}, writer expects {}", frame.resolution(), self.resolution),
            )
            .into());
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| EncodingError::backend(BACKEND, "writer already finished"))?;
        stdin
            .write_all(frame.as_rgb_bytes())
            .map_err(|e| EncodingError::backend(BACKEND, format!("failed to write frame to ffmpeg: {}", e)))?;
        Ok(())
    }
}

impl VideoWriter for PipeWriter {
    fn codec(&self) -> &str {
        &self.codec
    }

    fn as_sink(&mut self) -> &mut dyn FrameSink {
        self
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| EncodingError::backend(BACKEND, "writer already finished"))?;

        let status = child
            .wait()
            .map_err(|e| EncodingError::backend(BACKEND, format!("failed to wait for ffmpeg: {}", e)))?;
        let stderr = self.collect_stderr();

        if !status.success() {
            warn!("ffmpeg ({}) exited with {}: {}", self.codec, status, stderr.trim());
            return Err(EncodingError::backend(
                BACKEND,
                format!("ffmpeg exited with {}: {}", status, truncate_diagnostic(&stderr, 160)),
            )
            .into());
        }
        Ok(())
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
