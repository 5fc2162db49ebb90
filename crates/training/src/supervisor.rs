//! Launches training processes and tracks them to completion.
//!
//! Each launch spawns one child process plus one watcher task. The child's
//! stdout and stderr go to a log file; the watcher owns both the
//! [`Child`] and the log handle, so it is the only place the log is closed
//! and the only writer of the job's terminal status.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use nova_core::error::CoreError;
use nova_core::paths::is_safe_component;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::command::{build_command, CommandInputs};
use crate::config::TrainingConfig;
use crate::job::{TrainLoraRequest, TrainingJob, TrainingStatus};
use crate::registry::JobRegistry;

/// Owns the job registry and the watcher tasks.
pub struct TrainingSupervisor {
    config: TrainingConfig,
    registry: Arc<JobRegistry>,
    /// Master token; every job's token is a child of it.
    shutdown: CancellationToken,
    /// Watcher tasks; finished handles are pruned on each launch.
    watchers: Mutex<Vec<JoinHandle<()>>>,
}

impl TrainingSupervisor {
    pub fn new(config: TrainingConfig) -> Self {
        Self::with_shutdown(config, CancellationToken::new())
    }

    /// Create a supervisor whose jobs are killed when `shutdown` fires.
    pub fn with_shutdown(config: TrainingConfig, shutdown: CancellationToken) -> Self {
        Self {
            config,
            registry: Arc::new(JobRegistry::new()),
            shutdown,
            watchers: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Validate `request`, start the training process, and return the
    /// `running` job without waiting for it to finish.
    ///
    /// Every path is resolved before anything is spawned. The job is
    /// registered only once the child is running. Path resolution, log
    /// creation and the spawn itself touch the filesystem, so they run on
    /// the blocking pool.
    pub async fn launch(&self, request: &TrainLoraRequest) -> Result<TrainingJob, CoreError> {
        let config = self.config.clone();
        let request = request.clone();
        let (job, child, log) = tokio::task::spawn_blocking(move || prepare(&config, &request))
            .await
            .map_err(|e| CoreError::Spawn(format!("Training launch task failed: {e}")))??;

        let cancel = self.shutdown.child_token();
        self.registry.insert(job.clone(), cancel.clone()).await;
        let handle = tokio::spawn(watch(
            Arc::clone(&self.registry),
            job.id.clone(),
            child,
            log,
            cancel,
        ));
        {
            let mut watchers = self.watchers.lock().await;
            watchers.retain(|h| !h.is_finished());
            watchers.push(handle);
        }

        tracing::info!(job_id = %job.id, "Training job started");
        Ok(job)
    }

    pub async fn get_job(&self, id: &str) -> Result<TrainingJob, CoreError> {
        self.registry
            .get(id)
            .await
            .ok_or_else(|| CoreError::NotFound(format!("Training job not found: {id}")))
    }

    pub async fn list_jobs(&self) -> Vec<TrainingJob> {
        self.registry.list().await
    }

    /// Ask a running job to stop. Its watcher kills the child and records
    /// `failed`. Terminal jobs are returned as-is.
    pub async fn cancel_job(&self, id: &str) -> Result<TrainingJob, CoreError> {
        let job = self
            .registry
            .request_cancel(id)
            .await
            .ok_or_else(|| CoreError::NotFound(format!("Training job not found: {id}")))?;
        if !job.status.is_terminal() {
            tracing::info!(job_id = %id, "Cancellation requested for training job");
        }
        Ok(job)
    }

    /// Kill every running child and wait up to `grace` for the watchers to
    /// record their final status.
    pub async fn shutdown(&self, grace: Duration) {
        tracing::info!("Shutting down training supervisor");
        self.shutdown.cancel();

        let deadline = tokio::time::Instant::now() + grace;
        let handles: Vec<_> = self.watchers.lock().await.drain(..).collect();
        for handle in handles {
            if tokio::time::timeout_at(deadline, handle).await.is_err() {
                tracing::warn!("Training watcher still running after shutdown grace period");
            }
        }
    }
}

/// Resolve every path for `request`, open its log and spawn the child.
fn prepare(
    config: &TrainingConfig,
    request: &TrainLoraRequest,
) -> Result<(TrainingJob, Child, std::fs::File), CoreError> {
    config.ensure_engine_root()?;

    if !is_safe_component(&request.character_id) {
        return Err(CoreError::InvalidArgument(format!(
            "Invalid character_id: '{}'",
            request.character_id
        )));
    }
    let output_name = request.effective_output_name().to_string();
    if !is_safe_component(&output_name) {
        return Err(CoreError::InvalidArgument(format!(
            "Invalid output_name: '{output_name}'"
        )));
    }

    let resolver = config.resolver();
    let dataset_dir = resolver.resolve_dataset_path(&request.dataset_path)?;
    let base_model = resolver.resolve_base_model(request.base_model.as_deref())?;
    let output_dir =
        resolver.resolve_output_dir(&request.character_id, request.output_dir.as_deref())?;

    let created_at = Utc::now();
    let output_weight_path = output_dir.join(format!("{output_name}.safetensors"));
    let log_path = output_dir.join(format!(
        "train_{output_name}_{}.log",
        created_at.timestamp_millis()
    ));

    let command = build_command(
        &CommandInputs {
            python: &config.python,
            script: &config.train_script,
            base_model: &base_model,
            dataset_dir: &dataset_dir,
            output_dir: &output_dir,
            output_name: &output_name,
        },
        request,
    );

    tracing::info!(
        character_id = %request.character_id,
        command = %command.join(" "),
        log_path = %log_path.display(),
        "Launching training process",
    );

    let (child, log) = match spawn_logged(&command, &config.engine_root, &log_path) {
        Ok(spawned) => spawned,
        Err(e) => {
            if let Err(rm) = std::fs::remove_file(&log_path) {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %log_path.display(), error = %rm, "Failed to remove log file");
                }
            }
            tracing::error!(error = %e, program = %command[0], "Training process failed to start");
            return Err(CoreError::Spawn(format!(
                "Failed to launch training process: {e}. Ensure the interpreter and training script are installed."
            )));
        }
    };

    let job = TrainingJob {
        id: uuid::Uuid::new_v4().to_string(),
        command,
        status: TrainingStatus::Running,
        log_path,
        output_dir,
        output_weight_path,
        created_at,
        exit_code: None,
        finished_at: None,
    };
    Ok((job, child, log))
}

/// Open the log file and spawn `command` with both output streams
/// redirected into it. Returns the child and the parent's log handle.
fn spawn_logged(
    command: &[String],
    working_dir: &Path,
    log_path: &Path,
) -> std::io::Result<(Child, std::fs::File)> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"))?;

    let log = std::fs::File::create(log_path)?;
    let stdout = log.try_clone()?;
    let stderr = log.try_clone()?;

    let child = Command::new(program)
        .args(args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .kill_on_drop(true)
        .spawn()?;

    Ok((child, log))
}

/// Wait for the child to exit (or kill it on cancellation), append the
/// exit trailer, close the log, then record the terminal status.
async fn watch(
    registry: Arc<JobRegistry>,
    job_id: String,
    mut child: Child,
    log: std::fs::File,
    cancel: CancellationToken,
) {
    // An exit that races a cancel is still recorded as a normal exit.
    let (wait_result, cancelled) = tokio::select! {
        biased;
        status = child.wait() => (status, false),
        _ = cancel.cancelled() => {
            if let Err(e) = child.start_kill() {
                tracing::warn!(job_id = %job_id, error = %e, "Failed to kill training process");
            }
            (child.wait().await, true)
        }
    };

    let (status, exit_code, trailer) = match &wait_result {
        Ok(exit) => {
            let status = if exit.success() && !cancelled {
                TrainingStatus::Completed
            } else {
                TrainingStatus::Failed
            };
            let trailer = match exit.code() {
                Some(code) => format!("process exited with code {code}"),
                None => "process terminated by signal".to_string(),
            };
            (status, exit.code(), trailer)
        }
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "Failed to wait for training process");
            (TrainingStatus::Failed, None, format!("failed to wait for process: {e}"))
        }
    };
    let trailer = if cancelled {
        format!("\n[supervisor] {trailer} (cancelled)\n")
    } else {
        format!("\n[supervisor] {trailer}\n")
    };

    let mut log = tokio::fs::File::from_std(log);
    if let Err(e) = log.write_all(trailer.as_bytes()).await {
        tracing::warn!(job_id = %job_id, error = %e, "Failed to write log trailer");
    }
    if let Err(e) = log.flush().await {
        tracing::warn!(job_id = %job_id, error = %e, "Failed to flush training log");
    }
    drop(log);

    registry.finish(&job_id, status, exit_code).await;
    tracing::info!(job_id = %job_id, ?status, exit_code, cancelled, "Training job finished");
}
