use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{InputError, JobError, Result};

/// MIME type used when streaming finished videos
pub const VIDEO_MIME_TYPE: &str = "video/mp4";

/// Extension of every file this crate writes to the output directory
pub const VIDEO_EXTENSION: &str = "mp4";

/// A finished video in the output directory
#[derive(Debug, Clone, Serialize)]
pub struct VideoEntry {
    pub file_name: String,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
}

/// Append-only directory of finished videos
///
/// File names derive from unique job ids, so concurrent jobs never collide
/// and readers need no coordination.
#[derive(Debug, Clone)]
pub struct OutputLibrary {
    dir: PathBuf,
}

impl OutputLibrary {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the output directory if needed
    pub fn ensure_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Output file name for a job
    pub fn file_name_for(job_id: &str) -> String {
        format!("{}.{}", job_id, VIDEO_EXTENSION)
    }

    /// Full path for a file name, refusing anything that escapes the directory
    pub fn resolve(&self, file_name: &str) -> Result<PathBuf> {
        let plain = Path::new(file_name)
            .file_name()
            .map(|name| name == file_name)
            .unwrap_or(false);
        if !plain || file_name.starts_with('.') {
            return Err(InputError::Rejected {
                path: file_name.to_string(),
                reason: "not a plain file name".to_string(),
            }
            .into());
        }
        Ok(self.dir.join(file_name))
    }

    /// Enumerate finished videos, newest first
    pub fn list(&self) -> Result<Vec<VideoEntry>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(VIDEO_EXTENSION) {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push(VideoEntry {
                file_name: entry.file_name().to_string_lossy().to_string(),
                size_bytes: metadata.len(),
                modified_at: DateTime::<Utc>::from(modified),
            });
        }

        entries.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        debug!("Listed {} videos in {}", entries.len(), self.dir.display());
        Ok(entries)
    }

    /// Open a video for streaming, returning the file and its MIME type
    pub async fn open(&self, file_name: &str) -> Result<(tokio::fs::File, &'static str)> {
        let path = self.resolve(file_name)?;
        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok((file, VIDEO_MIME_TYPE)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(JobError::NotFound {
                id: file_name.to_string(),
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete one video by file name
    pub fn delete(&self, file_name: &str) -> Result<()> {
        let path = self.resolve(file_name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted video {}", file_name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(JobError::NotFound {
                id: file_name.to_string(),
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove videos whose modification time is older than `max_age`
    ///
    /// Returns the number of files removed.
    pub fn cleanup_older_than(&self, max_age: Duration) -> Result<usize> {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut removed = 0;

        for entry in self.list()? {
            let modified = SystemTime::from(entry.modified_at);
            if modified >= cutoff {
                continue;
            }
            match std::fs::remove_file(self.dir.join(&entry.file_name)) {
                Ok(()) => {
                    info!("Removed old video: {}", entry.file_name);
                    removed += 1;
                }
                Err(e) => warn!("Could not remove old video {}: {}", entry.file_name, e),
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReelError;
    use tempfile::tempdir;

    #[test]
    fn test_list_only_videos() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"aaaa").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let library = OutputLibrary::new(dir.path());
        let videos = library.list().unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].file_name, "a.mp4");
        assert_eq!(videos[0].size_bytes, 4);
    }

    #[test]
    fn test_missing_dir_lists_nothing() {
        let dir = tempdir().unwrap();
        let library = OutputLibrary::new(dir.path().join("nope"));
        assert!(library.list().unwrap().is_empty());
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let library = OutputLibrary::new("/srv/videos");
        assert!(library.resolve("job.mp4").is_ok());
        assert!(library.resolve("../etc/passwd").is_err());
        assert!(library.resolve("sub/job.mp4").is_err());
        assert!(library.resolve("..").is_err());
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"aaaa").unwrap();
        let library = OutputLibrary::new(dir.path());

        library.delete("a.mp4").unwrap();
        assert!(!dir.path().join("a.mp4").exists());
        assert!(matches!(
            library.delete("a.mp4"),
            Err(ReelError::Job(JobError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_cleanup_keeps_recent_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("fresh.mp4"), b"data").unwrap();
        let library = OutputLibrary::new(dir.path());

        assert_eq!(library.cleanup_older_than(Duration::from_secs(3600)).unwrap(), 0);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(library.cleanup_older_than(Duration::ZERO).unwrap(), 1);
        assert!(library.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_reports_mime_type() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"aaaa").unwrap();
        let library = OutputLibrary::new(dir.path());

        let (_file, mime) = library.open("a.mp4").await.unwrap();
        assert_eq!(mime, "video/mp4");
        assert!(library.open("missing.mp4").await.is_err());
    }
}
