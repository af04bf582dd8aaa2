//! Lightweight container inspection used to verify encoder output.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use crate::error::{truncate_diagnostic, EncodingError, Result};

/// What a probe learned about a finished video file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeReport {
    pub duration_secs: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec: Option<String>,
}

/// Reads basic facts out of an encoded container
pub trait ContainerProbe: Send + Sync {
    fn name(&self) -> &str;

    fn probe(&self, path: &Path) -> Result<ProbeReport>;
}

/// Probe backed by the `ffprobe` CLI
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    ffprobe_path: PathBuf,
}

impl FfprobeProbe {
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }

    /// Create a probe that finds ffprobe on `PATH`
    pub fn from_path() -> Option<Self> {
        which::which("ffprobe").ok().map(Self::new)
    }
}

impl ContainerProbe for FfprobeProbe {
    fn name(&self) -> &str {
        "ffprobe"
    }

    fn probe(&self, path: &Path) -> Result<ProbeReport> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|e| EncodingError::Verification {
                reason: format!("failed to run ffprobe: {}", e),
            })?;

        if !output.status.success() {
            return Err(EncodingError::Verification {
                reason: format!(
                    "ffprobe could not read the output: {}",
                    truncate_diagnostic(&String::from_utf8_lossy(&output.stderr), 160)
                ),
            }
            .into());
        }

        parse_ffprobe_json(&String::from_utf8_lossy(&output.stdout))
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// Map `ffprobe -print_format json` output into a report
///
/// Container duration wins over the video stream's own duration.
pub fn parse_ffprobe_json(json: &str) -> Result<ProbeReport> {
    let parsed: FfprobeOutput = serde_json::from_str(json).map_err(|e| EncodingError::Verification {
        reason: format!("ffprobe JSON parse error: {}", e),
    })?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    let container_duration = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok());
    let stream_duration = video
        .and_then(|s| s.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok());

    Ok(ProbeReport {
        duration_secs: container_duration.or(stream_duration),
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
        codec: video.and_then(|s| s.codec_name.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_typical_output() {
        let json = r#"{
            "streams": [
                {"index": 0, "codec_name": "h264", "codec_type": "video",
                 "width": 640, "height": 480, "r_frame_rate": "24/1", "duration": "4.000000"}
            ],
            "format": {"filename": "x.mp4", "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
                       "duration": "4.000000", "size": "12345"}
        }"#;

        let report = parse_ffprobe_json(json).unwrap();
        assert_eq!(report.duration_secs, Some(4.0));
        assert_eq!(report.width, Some(640));
        assert_eq!(report.height, Some(480));
        assert_eq!(report.codec.as_deref(), Some("h264"));
    }

    #[test]
    fn test_stream_duration_fallback() {
        let json = r#"{"streams": [{"codec_type": "video", "duration": "2.5"}], "format": {}}"#;
        let report = parse_ffprobe_json(json).unwrap();
        assert_eq!(report.duration_secs, Some(2.5));
        assert_eq!(report.width, None);
    }

    #[test]
    fn test_garbage_is_verification_error() {
        assert!(parse_ffprobe_json("not json").is_err());
    }
}
