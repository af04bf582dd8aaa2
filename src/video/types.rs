use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::imageops::FilterType;
use image::{ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{InputError, Result};

/// Represents a single video frame
///
/// This is a simple wrapper around an RGB image buffer that provides
/// convenient methods for the pixel work done by transitions.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with black
    pub fn new_black(width: u32, height: u32) -> Self {
        Self {
            buffer: ImageBuffer::new(width, height),
        }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_pixel(width, height, Rgb(color));
        Self { buffer }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Set a pixel at the given coordinates
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        self.buffer.put_pixel(x, y, Rgb(color));
    }

    /// Get the underlying image buffer
    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    /// Get a mutable reference to the underlying image buffer
    pub fn as_image_mut(&mut self) -> &mut RgbImage {
        &mut self.buffer
    }

    /// Borrow the packed RGB24 bytes, row-major
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Create a frame from raw RGB bytes
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    /// Lanczos-resample to the given resolution, or clone if it already matches
    pub fn resized(&self, target: Resolution) -> Self {
        if self.resolution() == target {
            return self.clone();
        }
        let resized = image::imageops::resize(
            &self.buffer,
            target.width,
            target.height,
            FilterType::Lanczos3,
        );
        Self::new(resized)
    }

    /// Save the frame as a PNG file
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> std::result::Result<(), image::ImageError> {
        self.buffer
            .save_with_format(path, image::ImageFormat::Png)
    }
}

/// Output frame size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Round each dimension down to an even number (yuv420p needs even sizes)
    pub fn to_even(self) -> Self {
        Self {
            width: self.width - (self.width % 2),
            height: self.height - (self.height % 2),
        }
    }

    pub fn is_even(&self) -> bool {
        self.width % 2 == 0 && self.height % 2 == 0
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = InputError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || InputError::InvalidSettings {
            key: "resolution".to_string(),
            value: s.to_string(),
        };
        let (w, h) = s
            .trim()
            .split_once(&['x', 'X'][..])
            .ok_or_else(invalid)?;
        let width = w.trim().parse().map_err(|_| invalid())?;
        let height = h.trim().parse().map_err(|_| invalid())?;
        Ok(Self::new(width, height))
    }
}

/// How adjacent images are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionType {
    #[default]
    None,
    Fade,
    Slide,
    Zoom,
}

impl TransitionType {
    pub const ALL: [TransitionType; 4] = [Self::None, Self::Fade, Self::Slide, Self::Zoom];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Fade => "fade",
            Self::Slide => "slide",
            Self::Zoom => "zoom",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for TransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransitionType {
    type Err = InputError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| InputError::InvalidSettings {
                key: "transitionType".to_string(),
                value: s.to_string(),
            })
    }
}

/// Output quality level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
    Ultra,
}

impl Quality {
    pub const ALL: [Quality; 4] = [Self::Low, Self::Medium, Self::High, Self::Ultra];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Ultra => "ultra",
        }
    }

    /// Encoder knobs for this quality level
    pub fn preset(&self) -> QualityPreset {
        match self {
            Self::Low => QualityPreset::new("ultrafast", 28, 1000),
            Self::Medium => QualityPreset::new("fast", 23, 2500),
            Self::High => QualityPreset::new("medium", 20, 5000),
            Self::Ultra => QualityPreset::new("slow", 18, 8000),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = InputError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| InputError::InvalidSettings {
                key: "quality".to_string(),
                value: s.to_string(),
            })
    }
}

/// Preset / constant-rate-factor / bitrate triple handed to the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityPreset {
    pub preset: &'static str,
    pub crf: u8,
    pub bitrate_kbps: u32,
}

impl QualityPreset {
    const fn new(preset: &'static str, crf: u8, bitrate_kbps: u32) -> Self {
        Self {
            preset,
            crf,
            bitrate_kbps,
        }
    }

    pub fn bitrate_arg(&self) -> String {
        format!("{}k", self.bitrate_kbps)
    }
}

/// Per-job rendering settings, immutable once the job starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoSettings {
    /// Output frame rate (1-120)
    pub fps: u32,

    /// Output size; derived from the first readable image when absent
    pub resolution: Option<Resolution>,

    pub transition_type: TransitionType,

    /// Seconds each image stays on screen (0.5-10.0)
    pub duration_per_image: f64,

    pub quality: Quality,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            resolution: None,
            transition_type: TransitionType::None,
            duration_per_image: 2.0,
            quality: Quality::Medium,
        }
    }
}

impl VideoSettings {
    pub const FPS_RANGE: std::ops::RangeInclusive<u32> = 1..=120;
    pub const DURATION_RANGE: std::ops::RangeInclusive<f64> = 0.5..=10.0;

    /// Reject out-of-range values before a job is accepted
    pub fn validate(&self) -> Result<()> {
        if !Self::FPS_RANGE.contains(&self.fps) {
            return Err(InputError::InvalidSettings {
                key: "fps".to_string(),
                value: self.fps.to_string(),
            }
            .into());
        }

        if !self.duration_per_image.is_finite()
            || !Self::DURATION_RANGE.contains(&self.duration_per_image)
        {
            return Err(InputError::InvalidSettings {
                key: "durationPerImage".to_string(),
                value: self.duration_per_image.to_string(),
            }
            .into());
        }

        if let Some(resolution) = self.resolution {
            if resolution.to_even().width == 0 || resolution.to_even().height == 0 {
                return Err(InputError::InvalidSettings {
                    key: "resolution".to_string(),
                    value: resolution.to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Ordered image references owned by one job
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSet {
    paths: Vec<PathBuf>,
}

impl ImageSet {
    /// Fails with `InputError::EmptyImageSet` when no paths are given
    pub fn new<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Err(InputError::EmptyImageSet.into());
        }
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_parsing() {
        let res: Resolution = "1920x1080".parse().unwrap();
        assert_eq!(res, Resolution::new(1920, 1080));
        assert!("1920".parse::<Resolution>().is_err());
        assert!("axb".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_resolution_forced_even() {
        assert_eq!(Resolution::new(641, 481).to_even(), Resolution::new(640, 480));
        assert!(Resolution::new(640, 480).is_even());
    }

    #[test]
    fn test_quality_presets() {
        assert_eq!(Quality::Low.preset().preset, "ultrafast");
        assert_eq!(Quality::Medium.preset().crf, 23);
        assert_eq!(Quality::High.preset().bitrate_arg(), "5000k");
        assert_eq!(Quality::Ultra.preset().crf, 18);
    }

    #[test]
    fn test_settings_validation() {
        assert!(VideoSettings::default().validate().is_ok());

        let settings = VideoSettings { fps: 0, ..Default::default() };
        assert!(settings.validate().is_err());

        let settings = VideoSettings { fps: 121, ..Default::default() };
        assert!(settings.validate().is_err());

        let settings = VideoSettings { duration_per_image: 0.25, ..Default::default() };
        assert!(settings.validate().is_err());

        let settings = VideoSettings { duration_per_image: f64::NAN, ..Default::default() };
        assert!(settings.validate().is_err());

        let settings = VideoSettings {
            resolution: Some(Resolution::new(1, 720)),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_json_names() {
        let json = r#"{"fps":24,"transitionType":"fade","durationPerImage":1.0,"quality":"high"}"#;
        let settings: VideoSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.fps, 24);
        assert_eq!(settings.transition_type, TransitionType::Fade);
        assert_eq!(settings.quality, Quality::High);
        assert_eq!(settings.resolution, None);
    }

    #[test]
    fn test_empty_image_set_rejected() {
        let empty: Vec<PathBuf> = Vec::new();
        assert!(ImageSet::new(empty).is_err());
        assert_eq!(ImageSet::new(["a.png", "b.png"]).unwrap().len(), 2);
    }

    #[test]
    fn test_frame_resize_and_bytes() {
        let frame = Frame::new_filled(8, 6, [10, 20, 30]);
        let resized = frame.resized(Resolution::new(4, 2));
        assert_eq!(resized.resolution(), Resolution::new(4, 2));
        assert_eq!(frame.as_rgb_bytes().len(), 8 * 6 * 3);
        assert_eq!(frame.get_pixel(3, 3), [10, 20, 30]);
    }
}
