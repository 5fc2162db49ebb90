//! Training request and job snapshot types.

use std::path::PathBuf;

use nova_core::types::Timestamp;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NETWORK_DIM: u32 = 16;
pub const DEFAULT_MAX_TRAIN_STEPS: u32 = 300;
pub const DEFAULT_LEARNING_RATE: f64 = 1e-4;

/// Request to train a LoRA for one character.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainLoraRequest {
    /// Owner of the output; names the default output directory.
    pub character_id: String,
    pub dataset_path: String,
    #[serde(default)]
    pub base_model: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    /// Defaults to `character_id`.
    #[serde(default)]
    pub output_name: Option<String>,
    /// Missing, `null` and `0` all mean [`DEFAULT_NETWORK_DIM`].
    #[serde(default)]
    pub network_dim: Option<u32>,
    /// Missing, `null` and `0` all mean [`DEFAULT_MAX_TRAIN_STEPS`].
    #[serde(default)]
    pub max_train_steps: Option<u32>,
    /// Missing, `null` and `0` all mean [`DEFAULT_LEARNING_RATE`].
    #[serde(default)]
    pub learning_rate: Option<f64>,
    /// Appended to the command line verbatim. Callers are trusted to
    /// have vetted these.
    #[serde(default)]
    pub additional_args: Option<Vec<String>>,
}

impl TrainLoraRequest {
    pub fn new(character_id: impl Into<String>, dataset_path: impl Into<String>) -> Self {
        Self {
            character_id: character_id.into(),
            dataset_path: dataset_path.into(),
            base_model: None,
            output_dir: None,
            output_name: None,
            network_dim: None,
            max_train_steps: None,
            learning_rate: None,
            additional_args: None,
        }
    }

    /// Explicit output name, else the character id.
    pub fn effective_output_name(&self) -> &str {
        self.output_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.character_id)
    }

    pub fn effective_network_dim(&self) -> u32 {
        self.network_dim
            .filter(|&d| d > 0)
            .unwrap_or(DEFAULT_NETWORK_DIM)
    }

    pub fn effective_max_train_steps(&self) -> u32 {
        self.max_train_steps
            .filter(|&s| s > 0)
            .unwrap_or(DEFAULT_MAX_TRAIN_STEPS)
    }

    pub fn effective_learning_rate(&self) -> f64 {
        self.learning_rate
            .filter(|&lr| lr != 0.0)
            .unwrap_or(DEFAULT_LEARNING_RATE)
    }

    pub fn extra_args(&self) -> &[String] {
        self.additional_args.as_deref().unwrap_or_default()
    }
}

/// Lifecycle of a training process. `Running` is the only non-terminal
/// state and is never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    Running,
    Completed,
    Failed,
}

impl TrainingStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Snapshot of one training job.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingJob {
    pub id: String,
    /// Full argv, interpreter first.
    pub command: Vec<String>,
    pub status: TrainingStatus,
    pub log_path: PathBuf,
    pub output_dir: PathBuf,
    pub output_weight_path: PathBuf,
    pub created_at: Timestamp,
    /// `None` while running, or when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub finished_at: Option<Timestamp>,
}
