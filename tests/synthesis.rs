//! End-to-end synthesis against the real ffmpeg and ffprobe tools
//!
//! Skipped when either tool is missing from PATH.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use reelsmith::{
    config::Config,
    encoder::{ContainerProbe, FfprobeProbe},
    job::{JobStatus, Orchestrator, SynthesisRequest},
    video::{TransitionType, VideoSettings},
};
use tempfile::TempDir;

fn tools_available() -> bool {
    let found = which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok();
    if !found {
        eprintln!("ffmpeg/ffprobe not on PATH, skipping");
    }
    found
}

fn write_images(dir: &Path, colors: &[[u8; 3]]) -> Vec<PathBuf> {
    colors
        .iter()
        .enumerate()
        .map(|(i, color)| {
            let path = dir.join(format!("image_{}.png", i));
            RgbImage::from_pixel(64, 48, Rgb(*color)).save(&path).unwrap();
            path
        })
        .collect()
}

fn config_in(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.output_dir = dir.path().join("videos");
    config.storage.scratch_dir = Some(dir.path().to_path_buf());
    config.encoder.worker_threads = 2;
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_three_images_with_fade() {
    if !tools_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let images = write_images(dir.path(), &[[255, 0, 0], [0, 255, 0], [0, 0, 255]]);
    let orchestrator = Orchestrator::from_config(&config_in(&dir)).unwrap();

    let ticket = orchestrator
        .submit(SynthesisRequest {
            job_id: Some("fade-job".into()),
            images,
            settings: VideoSettings {
                fps: 24,
                transition_type: TransitionType::Fade,
                duration_per_image: 1.0,
                ..VideoSettings::default()
            },
        })
        .unwrap();
    let record = ticket.wait().await;

    assert_eq!(record.status, JobStatus::Completed, "job failed: {:?}", record.error);
    assert_eq!(record.progress, 100);

    let output = record.output.unwrap();
    assert_eq!(output.file_name, "fade-job.mp4");
    assert!(output.size_bytes > 0);

    // 72 still frames + 2 x 12 transition frames at 24 fps
    let report = FfprobeProbe::from_path().unwrap().probe(&output.path).unwrap();
    let duration = report.duration_secs.unwrap();
    assert!((duration - 4.0).abs() <= 1.0 / 24.0 + 1e-3, "{}", duration);
    assert_eq!(report.width, Some(64));
    assert_eq!(report.height, Some(48));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_single_image_without_transition() {
    if !tools_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let images = write_images(dir.path(), &[[90, 90, 90]]);
    let orchestrator = Orchestrator::from_config(&config_in(&dir)).unwrap();

    let ticket = orchestrator
        .submit(SynthesisRequest {
            images,
            settings: VideoSettings {
                fps: 30,
                duration_per_image: 2.0,
                ..VideoSettings::default()
            },
            ..SynthesisRequest::default()
        })
        .unwrap();
    let record = ticket.wait().await;

    assert_eq!(record.status, JobStatus::Completed, "job failed: {:?}", record.error);
    let output = record.output.unwrap();
    assert!((output.duration_secs - 2.0).abs() <= 1.0 / 30.0 + 1e-3);
    assert_eq!(orchestrator.synthesizer().library().list().unwrap().len(), 1);
}
