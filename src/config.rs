use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{ConfigError, Result},
    video::types::{Quality, Resolution, TransitionType, VideoSettings},
};

/// Environment variables that override file configuration
pub const ENV_OUTPUT_DIR: &str = "REELSMITH_OUTPUT_DIR";
pub const ENV_DEFAULT_FPS: &str = "REELSMITH_DEFAULT_FPS";
pub const ENV_DEFAULT_RESOLUTION: &str = "REELSMITH_DEFAULT_RESOLUTION";
pub const ENV_MAX_IMAGE_BYTES: &str = "REELSMITH_MAX_IMAGE_BYTES";
pub const ENV_ALLOWED_MIME_TYPES: &str = "REELSMITH_ALLOWED_MIME_TYPES";
pub const ENV_FFMPEG: &str = "REELSMITH_FFMPEG";
pub const ENV_FFPROBE: &str = "REELSMITH_FFPROBE";

/// Main configuration for reelsmith
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Settings applied when a request leaves them out
    pub video: VideoDefaults,

    /// Where videos go and which images are accepted
    pub storage: StorageConfig,

    /// Encoder toolchain and worker pool
    pub encoder: EncoderConfig,

    /// Client-side status polling
    pub polling: PollingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|_| ConfigError::ParseFailed {
            path: path.display().to_string(),
        })?;
        Ok(config)
    }

    /// File (or defaults), then environment overrides, then validation
    ///
    /// Everything built from the result can assume the values are in range.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_optional_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`] with overrides taken from `lookup`
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::from_optional_file(path)?;
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn from_optional_file(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `REELSMITH_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            self.storage.output_dir = PathBuf::from(dir);
        }
        if let Some(fps) = lookup(ENV_DEFAULT_FPS) {
            self.video.default_fps = parse_value(ENV_DEFAULT_FPS, &fps)?;
        }
        if let Some(resolution) = lookup(ENV_DEFAULT_RESOLUTION) {
            self.video.default_resolution = Some(parse_value(ENV_DEFAULT_RESOLUTION, &resolution)?);
        }
        if let Some(bytes) = lookup(ENV_MAX_IMAGE_BYTES) {
            self.storage.max_image_bytes = parse_value(ENV_MAX_IMAGE_BYTES, &bytes)?;
        }
        if let Some(types) = lookup(ENV_ALLOWED_MIME_TYPES) {
            self.storage.allowed_mime_types = types
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(path) = lookup(ENV_FFMPEG) {
            self.encoder.ffmpeg_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup(ENV_FFPROBE) {
            self.encoder.ffprobe_path = Some(PathBuf::from(path));
        }

        debug!("Configuration after overrides: {:?}", self);
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.video.validate()?;
        self.storage.validate()?;
        self.encoder.validate()?;
        self.polling.validate()?;
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }
        .into()
    })
}

fn invalid(key: &str, value: impl ToString) -> crate::error::ReelError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
    .into()
}

/// Defaults for per-job video settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoDefaults {
    pub default_fps: u32,

    pub default_transition: TransitionType,

    pub default_duration_per_image: f64,

    pub default_quality: Quality,

    /// Leave unset to use the first image's size
    pub default_resolution: Option<Resolution>,
}

impl Default for VideoDefaults {
    fn default() -> Self {
        Self {
            default_fps: 30,
            default_transition: TransitionType::None,
            default_duration_per_image: 2.0,
            default_quality: Quality::Medium,
            default_resolution: None,
        }
    }
}

impl VideoDefaults {
    /// Job settings built from these defaults
    pub fn settings(&self) -> VideoSettings {
        VideoSettings {
            fps: self.default_fps,
            resolution: self.default_resolution,
            transition_type: self.default_transition,
            duration_per_image: self.default_duration_per_image,
            quality: self.default_quality,
        }
    }

    fn validate(&self) -> Result<()> {
        self.settings().validate().map_err(|_| {
            invalid(
                "video",
                format!(
                    "fps={} duration={} resolution={:?}",
                    self.default_fps, self.default_duration_per_image, self.default_resolution
                ),
            )
        })
    }
}

/// Output directory, retention and image intake limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub output_dir: PathBuf,

    /// Parent for per-job scratch directories; system temp when unset
    pub scratch_dir: Option<PathBuf>,

    /// Largest accepted source image, in bytes
    pub max_image_bytes: u64,

    pub allowed_mime_types: Vec<String>,

    /// Videos older than this are removed by `cleanup`
    pub retention_days: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("processed_videos"),
            scratch_dir: None,
            max_image_bytes: 100 * 1024 * 1024,
            allowed_mime_types: [
                "image/jpeg",
                "image/png",
                "image/gif",
                "image/bmp",
                "image/tiff",
                "image/webp",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            retention_days: 7,
        }
    }
}

impl StorageConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days * 24 * 60 * 60)
    }

    fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(invalid("storage.output_dir", ""));
        }
        if self.max_image_bytes == 0 {
            return Err(invalid("storage.max_image_bytes", self.max_image_bytes));
        }
        if self.allowed_mime_types.is_empty() {
            return Err(invalid("storage.allowed_mime_types", "[]"));
        }
        Ok(())
    }
}

/// Encoder toolchain settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Explicit ffmpeg binary; searched on PATH when unset
    pub ffmpeg_path: Option<PathBuf>,

    pub ffprobe_path: Option<PathBuf>,

    /// Codec identifiers tried in order by the in-process backend
    pub codec_candidates: Vec<String>,

    /// Size of the decode/render worker pool
    pub worker_threads: usize,

    /// Allowed gap between probed and expected duration, in frames
    pub duration_tolerance_frames: f64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            codec_candidates: vec!["libx264".to_string(), "mpeg4".to_string()],
            worker_threads: num_cpus::get().clamp(1, 4),
            duration_tolerance_frames: 1.0,
        }
    }
}

impl EncoderConfig {
    fn validate(&self) -> Result<()> {
        if self.codec_candidates.is_empty() {
            return Err(invalid("encoder.codec_candidates", "[]"));
        }
        if self.worker_threads == 0 {
            return Err(invalid("encoder.worker_threads", self.worker_threads));
        }
        if !self.duration_tolerance_frames.is_finite() || self.duration_tolerance_frames < 0.0 {
            return Err(invalid("encoder.duration_tolerance_frames", self.duration_tolerance_frames));
        }
        Ok(())
    }
}

/// Status poller settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_secs: f64,

    pub timeout_secs: f64,

    /// Consecutive transport failures tolerated before giving up
    pub max_transport_retries: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2.0,
            timeout_secs: 600.0,
            max_transport_retries: 3,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if !self.interval_secs.is_finite() || self.interval_secs <= 0.0 {
            return Err(invalid("polling.interval_secs", self.interval_secs));
        }
        if !self.timeout_secs.is_finite() || self.timeout_secs <= 0.0 {
            return Err(invalid("polling.timeout_secs", self.timeout_secs));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!((1..=4).contains(&config.encoder.worker_threads));
        assert_eq!(config.storage.max_image_bytes, 104_857_600);
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("reelsmith.toml");

        let mut original = Config::default();
        original.video.default_resolution = Some(Resolution::new(1280, 720));
        original.video.default_transition = TransitionType::Slide;

        original.save_to_file(&file_path).unwrap();
        let loaded = Config::from_file(&file_path).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(&file_path, "[video]\ndefault_fps = 24\ndefault_quality = \"high\"\n").unwrap();

        let config = Config::from_file(&file_path).unwrap();
        assert_eq!(config.video.default_fps, 24);
        assert_eq!(config.video.default_quality, Quality::High);
        assert_eq!(config.polling, PollingConfig::default());
    }

    #[test]
    fn test_missing_file() {
        assert!(Config::from_file("/nonexistent/reelsmith.toml").is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_OUTPUT_DIR, "/srv/videos"),
            (ENV_DEFAULT_FPS, "25"),
            (ENV_DEFAULT_RESOLUTION, "1920x1080"),
            (ENV_ALLOWED_MIME_TYPES, "image/png, image/jpeg,"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.storage.output_dir, PathBuf::from("/srv/videos"));
        assert_eq!(config.video.default_fps, 25);
        assert_eq!(config.video.default_resolution, Some(Resolution::new(1920, 1080)));
        assert_eq!(config.storage.allowed_mime_types, vec!["image/png", "image/jpeg"]);
    }

    #[test]
    fn test_bad_override_rejected() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| (key == ENV_DEFAULT_FPS).then(|| "fast".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_rejects_out_of_range_polling() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bad.toml");
        std::fs::write(&file_path, "[polling]\ninterval_secs = -1.0\n").unwrap();

        let result = Config::load_with(Some(&file_path), |_| None);
        assert!(matches!(
            result,
            Err(crate::error::ReelError::Config(ConfigError::InvalidValue { ref key, .. }))
                if key == "polling.interval_secs"
        ));

        std::fs::write(&file_path, "[polling]\ntimeout_secs = nan\n").unwrap();
        assert!(Config::load_with(Some(&file_path), |_| None).is_err());
    }

    #[test]
    fn test_load_without_file_applies_overrides() {
        let config = Config::load_with(None, |key| (key == ENV_DEFAULT_FPS).then(|| "12".to_string())).unwrap();
        assert_eq!(config.video.default_fps, 12);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::default();
        config.video.default_fps = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.polling.interval_secs = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.encoder.codec_candidates.clear();
        assert!(config.validate().is_err());
    }
}
