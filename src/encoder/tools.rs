use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

/// Locate an external tool, preferring a configured path over `PATH`
pub fn resolve_tool(name: &str, configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        debug!("Configured {} path {} does not exist, searching PATH", name, path.display());
    }
    which::which(name).ok()
}

/// Resolved paths of the ffmpeg toolchain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolPaths {
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
}

impl ToolPaths {
    pub fn resolve(ffmpeg: Option<&Path>, ffprobe: Option<&Path>) -> Self {
        Self {
            ffmpeg: resolve_tool("ffmpeg", ffmpeg),
            ffprobe: resolve_tool("ffprobe", ffprobe),
        }
    }
}

/// Video encoders compiled into the given ffmpeg binary
///
/// Parses `ffmpeg -hide_banner -encoders`, whose listing lines look like
/// ` V....D libx264   libx264 H.264 / AVC ...`.
pub fn list_video_encoders(ffmpeg: &Path) -> std::io::Result<Vec<String>> {
    let output = Command::new(ffmpeg).args(["-hide_banner", "-encoders"]).output()?;
    if !output.status.success() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("ffmpeg -encoders exited with {}", output.status),
        ));
    }
    Ok(parse_encoder_listing(&String::from_utf8_lossy(&output.stdout)))
}

pub(crate) fn parse_encoder_listing(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let flags = parts.next()?;
            let name = parts.next()?;
            let is_video = flags.len() == 6 && flags.starts_with('V') && name != "=";
            is_video.then(|| name.to_string())
        })
        .collect()
}
