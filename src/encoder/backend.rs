use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    encoder::writer::{EncodeParams, WriterFactory},
    error::{EncodingError, Result},
    video::sink::FrameSource,
};

/// A strategy that turns a frame sequence into an encoded container
pub trait EncoderBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Encode every frame of `source` into `output`
    fn encode(&self, source: &dyn FrameSource, params: &EncodeParams, output: &Path) -> Result<()>;
}

/// Encodes through a [`WriterFactory`], trying codec identifiers in order
///
/// The first codec that opens is used for the whole job.
pub struct InProcessBackend {
    factory: Arc<dyn WriterFactory>,
    codecs: Vec<String>,
}

impl InProcessBackend {
    pub fn new(factory: Arc<dyn WriterFactory>, codecs: Vec<String>) -> Self {
        Self { factory, codecs }
    }

    pub fn codecs(&self) -> &[String] {
        &self.codecs
    }
}

impl EncoderBackend for InProcessBackend {
    fn name(&self) -> &str {
        "in-process"
    }

    fn encode(&self, source: &dyn FrameSource, params: &EncodeParams, output: &Path) -> Result<()> {
        let mut rejected = Vec::new();
        let mut opened = None;

        for codec in &self.codecs {
            match self.factory.try_open(codec, params, output) {
                Ok(writer) => {
                    opened = Some(writer);
                    break;
                }
                Err(e) => {
                    debug!("{} could not open codec {}: {}", self.factory.name(), codec, e);
                    rejected.push(codec.as_str());
                }
            }
        }

        let Some(mut writer) = opened else {
            return Err(EncodingError::backend(
                self.name(),
                format!("no codec could be opened (tried {})", rejected.join(", ")),
            )
            .into());
        };

        info!(
            "Encoding {} frames with {} ({})",
            source.frame_count(),
            writer.codec(),
            self.factory.name()
        );

        source.render_into(writer.as_sink())?;
        writer.finish()
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::{ByteFactory, RefusingFactory, SolidSource};
    use super::*;
    use crate::video::types::{Quality, Resolution};

    fn params() -> EncodeParams {
        EncodeParams {
            resolution: Resolution::new(2, 2),
            fps: 10,
            quality: Quality::Medium,
        }
    }

    #[test]
    fn test_falls_through_codecs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp4");
        let factory = Arc::new(ByteFactory::new("mpeg4"));
        let backend = InProcessBackend::new(factory.clone(), vec!["libx264".into(), "mpeg4".into()]);

        backend.encode(&SolidSource { frames: 5 }, &params(), &output).unwrap();

        assert_eq!(factory.frames_written.load(Ordering::SeqCst), 5);
        assert_eq!(std::fs::read(&output).unwrap(), vec![7; 5]);
    }

    #[test]
    fn test_no_codec_opens() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(RefusingFactory::new());
        let attempts = factory.attempts.clone();
        let backend = InProcessBackend::new(factory, vec!["libx264".into(), "mpeg4".into()]);

        let err = backend
            .encode(&SolidSource { frames: 1 }, &params(), &dir.path().join("out.mp4"))
            .unwrap_err();

        assert_eq!(*attempts.lock().unwrap(), vec!["libx264", "mpeg4"]);
        assert!(err.to_string().contains("no codec could be opened"));
    }
}
