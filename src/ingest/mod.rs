//! Response ingestion
//!
//! Submission -> published form lookup -> validation -> store -> hub.

mod errors;
mod orchestrator;

pub use errors::{SubmitError, SubmitResult};
pub use orchestrator::{Ingestor, Receipt, RequestMeta, Submission};
