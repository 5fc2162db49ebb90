use std::sync::Arc;

use nova_comfyui::runner::WorkflowRunner;
use nova_core::error::CoreError;
use nova_training::supervisor::TrainingSupervisor;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone; every field is behind an `Arc` or is a token handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WorkerConfig>,
    /// Generation engine client.
    pub runner: Arc<WorkflowRunner>,
    /// Training process supervisor and job registry.
    pub supervisor: Arc<TrainingSupervisor>,
    /// Cancelled when the server begins shutting down; aborts in-flight
    /// poll loops.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build the runner and supervisor from `config`.
    pub fn new(config: WorkerConfig, shutdown: CancellationToken) -> Result<Self, CoreError> {
        let runner = WorkflowRunner::new(config.engine.clone())?;
        let supervisor =
            TrainingSupervisor::with_shutdown(config.training.clone(), shutdown.child_token());

        Ok(Self {
            config: Arc::new(config),
            runner: Arc::new(runner),
            supervisor: Arc::new(supervisor),
            shutdown,
        })
    }
}
