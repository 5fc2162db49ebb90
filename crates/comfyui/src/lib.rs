//! ComfyUI REST client and workflow runner.
//!
//! Submits prepared workflow descriptions to a ComfyUI server, polls its
//! history endpoint until the prompt reaches a terminal status, and
//! downloads the produced image into local storage.

pub mod api;
pub mod config;
pub mod history;
pub mod params;
pub mod poller;
pub mod runner;
