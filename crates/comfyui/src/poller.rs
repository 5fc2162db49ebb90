//! Wait-with-sleep loop over the history endpoint.
//!
//! The caller stays suspended until the prompt completes, fails, times out,
//! or the cancellation token fires. The loop entry instant is the start of
//! the deadline; each HTTP call has its own shorter timeout set on the
//! client.

use std::time::Duration;

use nova_core::error::CoreError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::ComfyUIApi;
use crate::history::{EngineHistoryRecord, HistoryStatus};

/// Default error detail when the engine gives none.
const DEFAULT_ENGINE_ERROR: &str = "ComfyUI reported an error.";

/// Poll loop bounds.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Sleep between history queries.
    pub interval: Duration,
    /// Wall-clock deadline measured from loop entry.
    pub timeout: Duration,
}

/// Poll `GET /api/history/{prompt_id}` until a terminal status appears.
///
/// A missing history entry is treated as "not started yet" and polling
/// continues until the deadline. A `completed` record is returned; an
/// `error` record becomes [`CoreError::Engine`] with the engine's detail.
pub async fn await_completion(
    api: &ComfyUIApi,
    prompt_id: &str,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<EngineHistoryRecord, CoreError> {
    let started = Instant::now();
    let mut polls: u32 = 0;

    loop {
        polls += 1;

        let history = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(prompt_id)),
            result = api.get_history(prompt_id) => {
                result.map_err(|e| e.into_engine_error("poll workflow history"))?
            }
        };

        match EngineHistoryRecord::extract(&history, prompt_id) {
            None => {
                let elapsed = started.elapsed();
                tracing::warn!(
                    prompt_id,
                    polls,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "History entry not yet available; engine may still be queuing the prompt",
                );
                if elapsed > config.timeout {
                    return Err(CoreError::Timeout(format!(
                        "ComfyUI did not provide history for prompt {prompt_id} within {:.1}s",
                        config.timeout.as_secs_f64()
                    )));
                }
            }
            Some(record) => match record.status {
                HistoryStatus::Completed => {
                    tracing::info!(
                        prompt_id,
                        polls,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Workflow completed",
                    );
                    return Ok(record);
                }
                HistoryStatus::Error => {
                    let detail = record
                        .error_detail
                        .unwrap_or_else(|| DEFAULT_ENGINE_ERROR.to_string());
                    tracing::error!(prompt_id, polls, error = %detail, "Workflow failed on engine");
                    return Err(CoreError::Engine(detail));
                }
                HistoryStatus::Pending => {
                    tracing::debug!(prompt_id, polls, "Workflow still running");
                }
            },
        }

        if started.elapsed() > config.timeout {
            return Err(CoreError::Timeout(format!(
                "Timed out waiting for ComfyUI to complete prompt {prompt_id} after {:.1}s",
                config.timeout.as_secs_f64()
            )));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(prompt_id)),
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
}

fn cancelled(prompt_id: &str) -> CoreError {
    CoreError::Cancelled(format!("Stopped waiting for prompt {prompt_id}"))
}
