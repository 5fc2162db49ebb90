//! Shared domain logic for the Nova worker.
//!
//! Holds the error taxonomy, filesystem path resolution, and the workflow
//! template engine. Everything here is synchronous and free of network
//! access so it can be exercised directly from unit tests.

pub mod config;
pub mod error;
pub mod paths;
pub mod types;
pub mod workflow;
