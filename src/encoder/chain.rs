use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::{
    encoder::{backend::EncoderBackend, probe::ContainerProbe, writer::EncodeParams},
    error::{EncodingError, ReelError, Result},
    video::sink::FrameSource,
};

/// A verified, non-empty output file
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedVideo {
    pub path: PathBuf,
    pub backend: String,
    pub size_bytes: u64,
    pub frame_count: usize,
    /// Probed duration, or the expected one when no probe is available
    pub duration_secs: f64,
}

/// Ordered list of encoder backends with output verification
///
/// Backends are tried in order for every job. A backend whose output is
/// missing, empty or the wrong length counts as failed and its partial file
/// is deleted before the next one runs.
pub struct BackendChain {
    backends: Vec<Box<dyn EncoderBackend>>,
    probe: Option<Box<dyn ContainerProbe>>,
    tolerance_frames: f64,
}

impl BackendChain {
    pub fn new(backends: Vec<Box<dyn EncoderBackend>>) -> Self {
        Self {
            backends,
            probe: None,
            tolerance_frames: 1.0,
        }
    }

    pub fn with_probe(mut self, probe: Option<Box<dyn ContainerProbe>>) -> Self {
        if probe.is_none() {
            warn!("No container probe available, output durations will not be verified");
        }
        self.probe = probe;
        self
    }

    pub fn with_tolerance_frames(mut self, frames: f64) -> Self {
        self.tolerance_frames = frames.max(0.0);
        self
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Encode `source` into `output` with the first backend that succeeds
    pub fn encode(&self, source: &dyn FrameSource, params: &EncodeParams, output: &Path) -> Result<EncodedVideo> {
        let mut failures = Vec::with_capacity(self.backends.len());

        for backend in &self.backends {
            remove_partial(output);
            info!("Trying {} encoder backend", backend.name());

            let attempt = backend
                .encode(source, params, output)
                .and_then(|()| self.verify(source, output));

            match attempt {
                Ok((size_bytes, duration_secs)) => {
                    info!(
                        "Encoded {} with {} backend ({} bytes, {:.2}s)",
                        output.display(),
                        backend.name(),
                        size_bytes,
                        duration_secs
                    );
                    return Ok(EncodedVideo {
                        path: output.to_path_buf(),
                        backend: backend.name().to_string(),
                        size_bytes,
                        frame_count: source.frame_count(),
                        duration_secs,
                    });
                }
                Err(e) => {
                    warn!("{} encoder backend failed: {}", backend.name(), e);
                    remove_partial(output);
                    failures.push(format!("{}: {}", backend.name(), failure_reason(&e)));
                }
            }
        }

        Err(EncodingError::Exhausted {
            attempts: if failures.is_empty() {
                "no backends configured".to_string()
            } else {
                failures.join("; ")
            },
        }
        .into())
    }

    /// Returns `(size, duration)` of a finished output
    fn verify(&self, source: &dyn FrameSource, output: &Path) -> Result<(u64, f64)> {
        let size = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(EncodingError::Verification {
                reason: "output file is missing or empty".to_string(),
            }
            .into());
        }

        let expected = source.duration_secs();
        let Some(probe) = &self.probe else {
            return Ok((size, expected));
        };

        let report = probe.probe(output)?;
        let Some(actual) = report.duration_secs else {
            warn!("{} reported no duration for {}", probe.name(), output.display());
            return Ok((size, expected));
        };

        let tolerance = self.tolerance_frames / source.fps().max(1) as f64 + 1e-3;
        if (actual - expected).abs() > tolerance {
            return Err(EncodingError::Verification {
                reason: format!("duration {:.3}s, expected {:.3}s", actual, expected),
            }
            .into());
        }
        Ok((size, actual))
    }
}

fn remove_partial(output: &Path) {
    if output.exists() {
        if let Err(e) = std::fs::remove_file(output) {
            warn!("Could not remove partial output {}: {}", output.display(), e);
        }
    }
}

/// Just the reason, without the wrapping error-kind prefixes
fn failure_reason(error: &ReelError) -> String {
    match error {
        ReelError::Encoding(EncodingError::BackendFailed { reason, .. }) => reason.clone(),
        ReelError::Encoding(other) => other.to_string(),
        other => other.to_string(),
    }
}
