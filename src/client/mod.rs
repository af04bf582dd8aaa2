//! Client side of the job lifecycle: fetching status and waiting for a
//! job to finish.

pub mod poller;
pub mod source;

pub use poller::{PollOptions, StatusPoller};
pub use source::{HttpStatusSource, StatusSource};
