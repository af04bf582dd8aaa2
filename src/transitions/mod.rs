//! # Transitions Module
//!
//! Blend strategies between consecutive images and the compositor that
//! expands a frame plan into frames.
//!
//! ## Available Transitions
//!
//! - **fade**: linear cross-fade
//! - **slide**: horizontal push to the left
//! - **zoom**: push-in on the outgoing image

pub mod compositor;
pub mod fade;
pub mod registry;
pub mod slide;
pub mod traits;
pub mod zoom;

pub use compositor::{Compositor, ImageProgress, PlanRenderer};
pub use fade::FadeTransition;
pub use registry::TransitionRegistry;
pub use slide::SlideTransition;
pub use traits::Transition;
pub use zoom::ZoomTransition;
