//! Training engine settings.

use std::path::PathBuf;

use nova_core::config::{self, process_env};
use nova_core::error::CoreError;
use nova_core::paths::{expand_user, PathResolver};

/// Default engine checkout location.
pub const DEFAULT_ENGINE_ROOT: &str = "external/kohya_ss";
/// Default interpreter used to run the training script.
pub const DEFAULT_PYTHON: &str = "python3";
/// Default training entrypoint, relative to the engine root.
pub const DEFAULT_TRAIN_SCRIPT: &str = "train_network.py";
/// Default parent of per-owner output directories.
pub const DEFAULT_OUTPUT_ROOT: &str = "storage/lora";

/// Settings for launching training processes.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Engine checkout; working directory of every child process.
    pub engine_root: PathBuf,
    pub python: String,
    pub train_script: String,
    pub output_root: PathBuf,
    /// Relative dataset paths are joined to this root, and resolved
    /// datasets must lie inside it.
    pub dataset_root: Option<PathBuf>,
    pub default_base_model: Option<String>,
    /// Root for relative base-model names. Defaults to `engine_root`.
    pub model_root: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            engine_root: PathBuf::from(DEFAULT_ENGINE_ROOT),
            python: DEFAULT_PYTHON.to_string(),
            train_script: DEFAULT_TRAIN_SCRIPT.to_string(),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            dataset_root: None,
            default_base_model: None,
            model_root: None,
        }
    }
}

impl TrainingConfig {
    /// Load from the process environment.
    ///
    /// | Env Var              | Default              |
    /// |----------------------|----------------------|
    /// | `KOHYA_PATH`         | `external/kohya_ss`  |
    /// | `KOHYA_PYTHON`       | `python3`            |
    /// | `KOHYA_TRAIN_SCRIPT` | `train_network.py`   |
    /// | `KOHYA_OUTPUT_DIR`   | `storage/lora`       |
    /// | `KOHYA_DATASET_ROOT` | `DATASET_ROOT`, else unset |
    /// | `KOHYA_BASE_MODEL`   | unset                |
    /// | `KOHYA_MODEL_ROOT`   | `KOHYA_PATH`         |
    pub fn from_env() -> Self {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str, default: &str| {
            expand_user(&config::string(&lookup, key).unwrap_or_else(|| default.to_string()))
        };

        Self {
            engine_root: path("KOHYA_PATH", DEFAULT_ENGINE_ROOT),
            python: config::string(&lookup, "KOHYA_PYTHON")
                .unwrap_or_else(|| DEFAULT_PYTHON.to_string()),
            train_script: config::string(&lookup, "KOHYA_TRAIN_SCRIPT")
                .unwrap_or_else(|| DEFAULT_TRAIN_SCRIPT.to_string()),
            output_root: path("KOHYA_OUTPUT_DIR", DEFAULT_OUTPUT_ROOT),
            dataset_root: config::string(&lookup, "KOHYA_DATASET_ROOT")
                .or_else(|| config::string(&lookup, "DATASET_ROOT"))
                .map(|p| expand_user(&p)),
            default_base_model: config::string(&lookup, "KOHYA_BASE_MODEL"),
            model_root: config::string(&lookup, "KOHYA_MODEL_ROOT").map(|p| expand_user(&p)),
        }
    }

    /// Path resolver bound to these roots.
    pub fn resolver(&self) -> PathResolver {
        PathResolver {
            dataset_root: self.dataset_root.clone(),
            output_root: self.output_root.clone(),
            model_root: self
                .model_root
                .clone()
                .unwrap_or_else(|| self.engine_root.clone()),
            default_base_model: self.default_base_model.clone(),
        }
    }

    /// Fail with [`CoreError::Config`] when the engine checkout is missing.
    pub fn ensure_engine_root(&self) -> Result<(), CoreError> {
        if self.engine_root.is_dir() {
            Ok(())
        } else {
            Err(CoreError::Config(format!(
                "KOHYA_PATH directory not found: {}",
                self.engine_root.display()
            )))
        }
    }
}
