//! # Reelsmith
//!
//! Turn an ordered set of still images into an encoded video, with optional
//! blended transitions between images and a pollable background job for
//! each request.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use reelsmith::{
//!     client::{PollOptions, StatusPoller},
//!     config::Config,
//!     job::{Orchestrator, SynthesisRequest},
//!     video::{TransitionType, VideoSettings},
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let orchestrator = Arc::new(Orchestrator::from_config(&config)?);
//!
//! let ticket = orchestrator.submit(SynthesisRequest {
//!     job_id: None,
//!     images: vec!["a.jpg".into(), "b.jpg".into(), "c.jpg".into()],
//!     settings: VideoSettings {
//!         fps: 24,
//!         transition_type: TransitionType::Fade,
//!         duration_per_image: 1.0,
//!         ..VideoSettings::default()
//!     },
//! })?;
//!
//! let poller = StatusPoller::new(orchestrator.clone(), PollOptions::from(&config.polling));
//! let record = poller
//!     .wait_for(ticket.id().as_str(), |progress, message| println!("{}% {}", progress, message))
//!     .await?;
//! println!("{:?}", record.video_reference);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`video`] - frames, settings, image loading, frame scheduling and the
//!   output library
//! - [`transitions`] - blend strategies and the compositor
//! - [`encoder`] - encoder backends and the fallback chain
//! - [`job`] - job records, the store and the orchestrator
//! - [`client`] - status sources and the poller
//! - [`config`] - configuration management
//!
//! ## Custom Transitions
//!
//! Implement [`Transition`](transitions::Transition) and register it:
//!
//! ```rust,no_run
//! use reelsmith::transitions::{Transition, TransitionRegistry};
//! use reelsmith::video::types::Frame;
//! use reelsmith::Result;
//!
//! struct Cut;
//!
//! impl Transition for Cut {
//!     fn name(&self) -> &str {
//!         "cut"
//!     }
//!
//!     fn description(&self) -> &str {
//!         "Hard cut at the midpoint"
//!     }
//!
//!     fn render(&self, from: &Frame, to: &Frame, alpha: f32) -> Result<Frame> {
//!         Ok(if alpha < 0.5 { from.clone() } else { to.clone() })
//!     }
//! }
//!
//! let mut registry = TransitionRegistry::new();
//! registry.register("cut", || Box::new(Cut));
//! ```

pub mod client;
pub mod config;
pub mod encoder;
pub mod error;
pub mod job;
pub mod transitions;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    client::{PollOptions, StatusPoller},
    config::Config,
    error::{ReelError, Result},
    job::{JobStatus, Orchestrator, SynthesisRequest},
    transitions::{Transition, TransitionRegistry},
    video::{ImageSet, TransitionType, VideoSettings},
};
