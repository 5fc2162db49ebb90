//! Kohya training process supervision.
//!
//! [`supervisor::TrainingSupervisor`] validates a training request, launches
//! the training script as a child process with its output captured to a log
//! file, and tracks the process to completion from a background task. Jobs
//! live in an in-memory [`registry::JobRegistry`] for the life of the
//! process.

pub mod command;
pub mod config;
pub mod job;
pub mod registry;
pub mod supervisor;
