use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::video::types::{Quality, QualityPreset, Resolution};

/// File name pattern for intermediate frames, as understood by ffmpeg's
/// image2 demuxer
pub const FRAME_PATTERN: &str = "frame_%06d.png";

/// Name of the `n`-th intermediate frame file
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:06}.png", index)
}

/// Where ffmpeg reads its video input from
#[derive(Debug, Clone, PartialEq)]
pub enum FfmpegInput {
    /// Numbered image files matching a printf-style pattern
    FrameSequence { pattern: PathBuf },
    /// Packed RGB24 frames on stdin
    RawRgbPipe { resolution: Resolution },
}

/// How the encoder is told what quality to aim for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControl {
    /// `-preset P -crf C`, for x264-family encoders
    ConstantRateFactor { preset: &'static str, crf: u8 },
    /// `-b:v Nk`, for encoders without a CRF mode
    Bitrate { kbps: u32 },
}

impl RateControl {
    pub fn for_codec(codec: &str, preset: QualityPreset) -> Self {
        if codec.contains("264") || codec.contains("265") {
            Self::ConstantRateFactor {
                preset: preset.preset,
                crf: preset.crf,
            }
        } else {
            Self::Bitrate {
                kbps: preset.bitrate_kbps,
            }
        }
    }
}

/// Typed ffmpeg invocation
///
/// Builds an argument vector rather than a shell string, so paths with
/// spaces or quotes are passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegCommand {
    program: PathBuf,
    input: FfmpegInput,
    fps: u32,
    codec: String,
    rate: RateControl,
    scale: Option<Resolution>,
    output: PathBuf,
}

impl FfmpegCommand {
    pub fn new(program: impl Into<PathBuf>, input: FfmpegInput, fps: u32, output: impl Into<PathBuf>) -> Self {
        let quality = Quality::default().preset();
        Self {
            program: program.into(),
            input,
            fps,
            codec: "libx264".to_string(),
            rate: RateControl::for_codec("libx264", quality),
            scale: None,
            output: output.into(),
        }
    }

    /// Set the output codec and derive rate control from the quality preset
    pub fn codec(mut self, codec: &str, quality: Quality) -> Self {
        self.codec = codec.to_string();
        self.rate = RateControl::for_codec(codec, quality.preset());
        self
    }

    /// Lanczos-rescale to `resolution`, forced even
    pub fn scale(mut self, resolution: Resolution) -> Self {
        self.scale = Some(resolution.to_even());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn rate_control(&self) -> RateControl {
        self.rate
    }

    /// Full argument list, excluding the program itself
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        let mut push = |s: &str| args.push(OsString::from(s));

        push("-y");
        push("-hide_banner");
        push("-loglevel");
        push("error");

        match &self.input {
            FfmpegInput::FrameSequence { .. } => {
                push("-framerate");
                push(&self.fps.to_string());
            }
            FfmpegInput::RawRgbPipe { resolution } => {
                push("-f");
                push("rawvideo");
                push("-pix_fmt");
                push("rgb24");
                push("-s");
                push(&resolution.to_string());
                push("-framerate");
                push(&self.fps.to_string());
            }
        }

        push("-i");
        match &self.input {
            FfmpegInput::FrameSequence { pattern } => args.push(pattern.as_os_str().to_owned()),
            FfmpegInput::RawRgbPipe { .. } => args.push(OsString::from("pipe:0")),
        }

        let mut push = |s: &str| args.push(OsString::from(s));
        push("-an");
        push("-c:v");
        push(&self.codec);
        match self.rate {
            RateControl::ConstantRateFactor { preset, crf } => {
                push("-preset");
                push(preset);
                push("-crf");
                push(&crf.to_string());
            }
            RateControl::Bitrate { kbps } => {
                push("-b:v");
                push(&format!("{}k", kbps));
            }
        }
        push("-pix_fmt");
        push("yuv420p");
        push("-movflags");
        push("+faststart");
        if let Some(scale) = self.scale {
            push("-vf");
            push(&format!("scale={}:{}:flags=lanczos", scale.width, scale.height));
        }
        push("-r");
        push(&self.fps.to_string());

        args.push(self.output.as_os_str().to_owned());
        args
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.args());
        command
    }
}
