//! HTTP handlers for the read-only API.

pub mod graph;
pub mod system;
