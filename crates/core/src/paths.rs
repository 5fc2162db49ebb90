//! Filesystem path resolution and containment checks.
//!
//! Every dataset and base-model path handed to the training process goes
//! through [`PathResolver`] first, so a bad path fails before anything is
//! spawned. [`PathResolver::resolve_output_dir`] is the only operation that
//! touches the filesystem beyond reading metadata.

use std::path::{Component, Path, PathBuf};

use crate::error::CoreError;

/// Maximum length of a single path component derived from caller input.
const MAX_COMPONENT_LEN: usize = 255;

// ---------------------------------------------------------------------------
// Free helpers
// ---------------------------------------------------------------------------

/// Expand a leading `~` to the current user's home directory.
///
/// Inputs without a leading `~`, or hosts without `HOME`, pass through
/// unchanged apart from surrounding whitespace being trimmed.
pub fn expand_user(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    if trimmed == "~" || trimmed.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            let mut path = PathBuf::from(home);
            if let Some(rest) = trimmed.strip_prefix("~/") {
                path.push(rest);
            }
            return path;
        }
    }
    PathBuf::from(trimmed)
}

/// Make `path` absolute and remove `.` / `..` components lexically.
///
/// Does not consult the filesystem, so it works for paths that do not
/// exist yet. Symlinks are left untouched.
pub fn normalize(path: &Path) -> Result<PathBuf, CoreError> {
    let absolute = std::path::absolute(path)?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

/// Resolve symlinks when the path exists, otherwise fall back to
/// [`normalize`].
pub fn resolve(path: &Path) -> Result<PathBuf, CoreError> {
    match path.canonicalize() {
        Ok(resolved) => Ok(resolved),
        Err(_) => normalize(path),
    }
}

/// Check that `path` lies inside `root` once both are resolved.
///
/// Returns the resolved candidate on success. Used by every endpoint that
/// accepts a caller-supplied path below a configured root.
pub fn ensure_contained(path: &Path, root: &Path) -> Result<PathBuf, CoreError> {
    let root = resolve(root)?;
    let candidate = resolve(path)?;
    if candidate.starts_with(&root) {
        Ok(candidate)
    } else {
        Err(CoreError::InvalidArgument(format!(
            "Path {} must be inside {}",
            candidate.display(),
            root.display()
        )))
    }
}

/// Whether `name` can be used as a single directory or file name.
///
/// Rejects empty names, `.`/`..`, separators, and NUL so that ids coming
/// from requests cannot climb out of the output root.
pub fn is_safe_component(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_COMPONENT_LEN
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves dataset, output, and base-model locations against the
/// configured roots.
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Root that relative dataset paths are joined to. When set, resolved
    /// datasets must also lie inside it.
    pub dataset_root: Option<PathBuf>,
    /// Parent of per-owner output directories.
    pub output_root: PathBuf,
    /// Root that relative model names are joined to and that every
    /// resolved base model must lie inside.
    pub model_root: PathBuf,
    /// Model used when a request does not name one.
    pub default_base_model: Option<String>,
}

impl PathResolver {
    /// Resolve a caller-supplied dataset location to an existing absolute path.
    pub fn resolve_dataset_path(&self, raw: &str) -> Result<PathBuf, CoreError> {
        if raw.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "Dataset path must not be empty".to_string(),
            ));
        }

        let mut path = expand_user(raw);
        if path.is_relative() {
            if let Some(root) = &self.dataset_root {
                path = root.join(path);
            }
        }

        let resolved = path.canonicalize().map_err(|_| {
            CoreError::NotFound(format!(
                "Dataset path does not exist: {}",
                display_normalized(&path)
            ))
        })?;

        if let Some(root) = &self.dataset_root {
            let root = root.canonicalize().map_err(|_| {
                CoreError::NotFound(format!("Dataset root does not exist: {}", root.display()))
            })?;
            if !resolved.starts_with(&root) {
                return Err(CoreError::NotFound(format!(
                    "Dataset path does not exist under {}: {}",
                    root.display(),
                    resolved.display()
                )));
            }
        }

        Ok(resolved)
    }

    /// Return (creating if needed) the output directory for `owner_id`.
    ///
    /// An explicit directory wins; otherwise `<output_root>/<owner_id>`.
    /// Calling it repeatedly with the same inputs yields the same path.
    pub fn resolve_output_dir(
        &self,
        owner_id: &str,
        explicit_dir: Option<&str>,
    ) -> Result<PathBuf, CoreError> {
        let directory = match explicit_dir.map(str::trim).filter(|d| !d.is_empty()) {
            Some(dir) => expand_user(dir),
            None => {
                if !is_safe_component(owner_id) {
                    return Err(CoreError::InvalidArgument(format!(
                        "Invalid owner id for output directory: '{owner_id}'"
                    )));
                }
                self.output_root.join(owner_id)
            }
        };

        let directory = normalize(&directory)?;
        std::fs::create_dir_all(&directory)?;
        tracing::debug!(path = %directory.display(), "Output directory ready");
        Ok(directory)
    }

    /// Resolve the base model checkpoint, falling back to the configured default.
    pub fn resolve_base_model(&self, requested: Option<&str>) -> Result<PathBuf, CoreError> {
        let model = requested
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .or_else(|| {
                self.default_base_model
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
            })
            .ok_or_else(|| {
                CoreError::Config(
                    "No base model specified. Provide base_model in the request or set KOHYA_BASE_MODEL."
                        .to_string(),
                )
            })?;

        let mut path = expand_user(model);
        if path.is_relative() {
            path = self.model_root.join(path);
        }

        let resolved = path.canonicalize().map_err(|_| {
            CoreError::NotFound(format!("Base model not found: {}", display_normalized(&path)))
        })?;

        let root = resolve(&self.model_root)?;
        if !resolved.starts_with(&root) {
            return Err(CoreError::InvalidArgument(format!(
                "Base model {} must be inside the model root {}",
                resolved.display(),
                root.display()
            )));
        }

        Ok(resolved)
    }
}

/// Best-effort normalized rendering for error messages.
fn display_normalized(path: &Path) -> String {
    normalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
