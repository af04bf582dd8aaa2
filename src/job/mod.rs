//! Background synthesis jobs
//!
//! A job is created when a request is accepted and is written only by the
//! task running it. Readers get snapshots from the store or a `JobTicket`.

pub mod orchestrator;
pub mod pipeline;
pub mod reporter;
pub mod store;
pub mod types;

pub use orchestrator::{JobTicket, Orchestrator, SynthesisRequest};
pub use pipeline::Synthesizer;
pub use reporter::ProgressReporter;
pub use store::{JobStore, MemoryJobStore};
pub use types::{JobId, JobRecord, JobStatus, OutputReference, StatusRecord};
