use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageFormat;
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::error::{InputError, Result};
use crate::video::types::{Frame, ImageSet, Resolution};

/// An image that was dropped from the set because it could not be decoded
#[derive(Debug, Clone)]
pub struct SkippedImage {
    pub path: PathBuf,
    pub reason: String,
}

/// Decoded images, all resampled to the job's target resolution
#[derive(Debug, Clone)]
pub struct LoadedImages {
    pub frames: Vec<Frame>,
    pub sources: Vec<PathBuf>,
    pub skipped: Vec<SkippedImage>,
    pub resolution: Resolution,
}

impl LoadedImages {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Decodes an image set on a bounded worker pool
pub struct ImageLoader {
    pool: Arc<ThreadPool>,
}

impl ImageLoader {
    pub fn new(pool: Arc<ThreadPool>) -> Self {
        Self { pool }
    }

    /// Decode every image, skip the unreadable ones and resample the rest
    ///
    /// The target resolution is `requested` when given, otherwise the first
    /// readable image's size. Either way each dimension is forced even.
    pub fn load(&self, images: &ImageSet, requested: Option<Resolution>) -> Result<LoadedImages> {
        debug!("Decoding {} images", images.len());

        let decoded: Vec<(PathBuf, std::result::Result<Frame, String>)> = self.pool.install(|| {
            images
                .paths()
                .par_iter()
                .map(|path| (path.clone(), decode_image(path)))
                .collect()
        });

        let mut readable = Vec::with_capacity(decoded.len());
        let mut skipped = Vec::new();
        for (path, result) in decoded {
            match result {
                Ok(frame) => readable.push((path, frame)),
                Err(reason) => {
                    warn!("Skipping unreadable image {}: {}", path.display(), reason);
                    skipped.push(SkippedImage { path, reason });
                }
            }
        }

        let Some((_, first)) = readable.first() else {
            return Err(InputError::NoReadableImages {
                attempted: images.len(),
            }
            .into());
        };

        let resolution = requested.unwrap_or_else(|| first.resolution()).to_even();
        if resolution.width == 0 || resolution.height == 0 {
            return Err(InputError::InvalidSettings {
                key: "resolution".to_string(),
                value: resolution.to_string(),
            }
            .into());
        }

        let (sources, frames): (Vec<PathBuf>, Vec<Frame>) = self.pool.install(|| {
            readable
                .into_par_iter()
                .map(|(path, frame)| (path, frame.resized(resolution)))
                .unzip()
        });

        info!(
            "Loaded {} of {} images at {} ({} skipped)",
            frames.len(),
            images.len(),
            resolution,
            skipped.len()
        );

        Ok(LoadedImages {
            frames,
            sources,
            skipped,
            resolution,
        })
    }
}

fn decode_image(path: &Path) -> std::result::Result<Frame, String> {
    let metadata = std::fs::metadata(path).map_err(|e| e.to_string())?;
    if metadata.len() == 0 {
        return Err("file is empty".to_string());
    }

    let image = image::open(path).map_err(|e| e.to_string())?;
    let rgb = match image {
        image::DynamicImage::ImageRgb8(img) => img,
        other => other.to_rgb8(),
    };
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err("image has no pixels".to_string());
    }
    Ok(Frame::new(rgb))
}

/// MIME type for a sniffed image format
pub fn mime_type_for(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Tiff => Some("image/tiff"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

/// Size and content-type gate applied before a file joins an image set
pub fn check_intake(path: &Path, storage: &StorageConfig) -> Result<()> {
    let rejected = |reason: String| InputError::Rejected {
        path: path.display().to_string(),
        reason,
    };

    let metadata = std::fs::metadata(path).map_err(|e| rejected(e.to_string()))?;
    if metadata.len() > storage.max_image_bytes {
        return Err(rejected(format!(
            "{} bytes exceeds the {} byte limit",
            metadata.len(),
            storage.max_image_bytes
        ))
        .into());
    }

    let mut header = [0u8; 64];
    let read = File::open(path)
        .and_then(|mut file| file.read(&mut header))
        .map_err(|e| rejected(e.to_string()))?;

    let mime = image::guess_format(&header[..read])
        .ok()
        .and_then(mime_type_for)
        .ok_or_else(|| rejected("unrecognised image format".to_string()))?;

    if !storage.allowed_mime_types.iter().any(|allowed| allowed == mime) {
        return Err(rejected(format!("unsupported type {}", mime)).into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReelError;
    use tempfile::tempdir;

    fn pool() -> Arc<ThreadPool> {
        Arc::new(rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap())
    }

    fn write_png(dir: &Path, name: &str, width: u32, height: u32, color: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        Frame::new_filled(width, height, color).save_png(&path).unwrap();
        path
    }

    #[test]
    fn test_resolution_from_first_image_forced_even() {
        let dir = tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", 33, 21, [255, 0, 0]);
        let b = write_png(dir.path(), "b.png", 64, 64, [0, 255, 0]);

        let loaded = ImageLoader::new(pool())
            .load(&ImageSet::new([a, b]).unwrap(), None)
            .unwrap();

        assert_eq!(loaded.resolution, Resolution::new(32, 20));
        assert!(loaded.frames.iter().all(|f| f.resolution() == Resolution::new(32, 20)));
    }

    #[test]
    fn test_unreadable_images_are_skipped_in_order() {
        let dir = tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", 16, 16, [255, 0, 0]);
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not an image").unwrap();
        let empty = dir.path().join("empty.jpg");
        std::fs::write(&empty, b"").unwrap();
        let c = write_png(dir.path(), "c.png", 16, 16, [0, 0, 255]);

        let set = ImageSet::new([a.clone(), broken, empty, c.clone()]).unwrap();
        let loaded = ImageLoader::new(pool())
            .load(&set, Some(Resolution::new(8, 8)))
            .unwrap();

        assert_eq!(loaded.sources, vec![a, c]);
        assert_eq!(loaded.skipped.len(), 2);
        assert_eq!(loaded.frames[0].get_pixel(4, 4), [255, 0, 0]);
        assert_eq!(loaded.frames[1].get_pixel(4, 4), [0, 0, 255]);
    }

    #[test]
    fn test_all_unreadable_is_input_error() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"junk").unwrap();

        let result = ImageLoader::new(pool()).load(&ImageSet::new([broken]).unwrap(), None);
        assert!(matches!(
            result,
            Err(ReelError::Input(InputError::NoReadableImages { attempted: 1 }))
        ));
    }

    #[test]
    fn test_intake_rejects_oversized_and_unknown() {
        let dir = tempdir().unwrap();
        let png = write_png(dir.path(), "ok.png", 4, 4, [1, 2, 3]);
        let text = dir.path().join("notes.png");
        std::fs::write(&text, b"hello world").unwrap();

        let storage = StorageConfig::default();
        assert!(check_intake(&png, &storage).is_ok());
        assert!(check_intake(&text, &storage).is_err());

        let tiny = StorageConfig {
            max_image_bytes: 8,
            ..StorageConfig::default()
        };
        assert!(check_intake(&png, &tiny).is_err());

        let jpeg_only = StorageConfig {
            allowed_mime_types: vec!["image/jpeg".to_string()],
            ..StorageConfig::default()
        };
        assert!(check_intake(&png, &jpeg_only).is_err());
    }
}
