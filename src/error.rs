use std::time::Duration;

use thiserror::Error;

/// Main error type for the reelsmith library
#[derive(Error, Debug)]
pub enum ReelError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Polling error: {0}")]
    Poll(#[from] PollError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Problems with the submitted images or settings
#[derive(Error, Debug)]
pub enum InputError {
    #[error("No images provided")]
    EmptyImageSet,

    #[error("None of the {attempted} images could be decoded")]
    NoReadableImages { attempted: usize },

    #[error("Invalid setting: {key} = {value}")]
    InvalidSettings { key: String, value: String },

    #[error("Image rejected: {path} ({reason})")]
    Rejected { path: String, reason: String },
}

/// Transition-specific errors
#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("Transition not found: {name}")]
    NotFound { name: String },

    #[error("Transition failed: {effect} - {reason}")]
    EffectFailed { effect: String, reason: String },

    #[error("Frame size mismatch in {effect}: {first} vs {second}")]
    SizeMismatch { effect: String, first: String, second: String },
}

/// Failures while turning frames into a video container
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("{backend} backend failed: {reason}")]
    BackendFailed { backend: String, reason: String },

    #[error("All encoder backends failed ({attempts})")]
    Exhausted { attempts: String },

    #[error("Output verification failed: {reason}")]
    Verification { reason: String },

    #[error("Transient IO failure during {operation}: {reason}")]
    TransientIo { operation: String, reason: String },
}

/// Job bookkeeping errors
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Job already exists: {id}")]
    AlreadyExists { id: String },

    #[error("Job not found: {id}")]
    NotFound { id: String },

    #[error("Job {id} is already {status} and cannot be modified")]
    Terminal { id: String, status: String },

    #[error("Job {id} worker stopped unexpectedly: {reason}")]
    Panicked { id: String, reason: String },
}

/// Client-side status polling errors
#[derive(Error, Debug)]
pub enum PollError {
    #[error("Timed out after {elapsed:?} waiting for job {job_id}")]
    Timeout { job_id: String, elapsed: Duration },

    #[error("Status request failed: {reason}")]
    Transport { reason: String },

    #[error("Status request failed {attempts} times in a row, last error: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("Job not found: {job_id}")]
    NotFound { job_id: String },

    #[error("Could not decode status response: {reason}")]
    Decode { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using ReelError
pub type Result<T> = std::result::Result<T, ReelError>;

impl ReelError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Encoding(EncodingError::TransientIo { .. }) => true,
            Self::Poll(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Get a user-friendly error message
    ///
    /// This is what ends up in a failed job's `error` field, so it never
    /// carries raw subprocess output.
    pub fn user_message(&self) -> String {
        match self {
            Self::Input(InputError::EmptyImageSet) => {
                "No images were provided. Select at least one image.".to_string()
            }
            Self::Input(InputError::NoReadableImages { attempted }) => {
                format!("None of the {} images could be read. Check they are valid image files.", attempted)
            }
            Self::Encoding(EncodingError::Exhausted { attempts }) => {
                format!("Video encoding failed ({})", attempts)
            }
            Self::Poll(PollError::Timeout { elapsed, .. }) => {
                format!("Gave up waiting for the video after {}s.", elapsed.as_secs())
            }
            _ => self.to_string(),
        }
    }
}

impl PollError {
    /// Transport hiccups are worth another attempt; everything else is final
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl EncodingError {
    pub fn backend<B: Into<String>, R: Into<String>>(backend: B, reason: R) -> Self {
        Self::BackendFailed {
            backend: backend.into(),
            reason: reason.into(),
        }
    }
}

/// Shorten tool output to something safe to show to a user
pub(crate) fn truncate_diagnostic(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let last_line = trimmed.lines().last().unwrap_or(trimmed);
    if last_line.chars().count() <= max_chars {
        last_line.to_string()
    } else {
        let mut short: String = last_line.chars().take(max_chars).collect();
        short.push('…');
        short
    }
}
