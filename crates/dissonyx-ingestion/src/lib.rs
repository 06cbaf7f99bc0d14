//! dissonyx-ingestion: Paper submission pipeline.
//!
//! A submission is added to the store, compared against every stored paper
//! sharing one of its topics, and the outcome is streamed back to the caller
//! as [`SubmissionEvent`]s.

pub mod events;
pub mod service;

pub use events::{Submission, SubmissionEvent};
pub use service::IngestionService;
