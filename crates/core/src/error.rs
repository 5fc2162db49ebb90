//! Error taxonomy shared by the engine client, the training supervisor,
//! and the HTTP facade.
//!
//! Each variant corresponds to one failure class the caller can act on.
//! A training process that exits non-zero is *not* an error: it is a
//! terminal `failed` status observed through the job record.

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Required configuration (template path, engine root, base model) is missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A referenced dataset, model, or template file does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A caller-supplied value was rejected before any work started.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A workflow template is not valid JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The generation engine rejected a call or returned an unusable response.
    #[error("Engine error: {0}")]
    Engine(String),

    /// The poll loop exceeded its deadline without a terminal status.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The training child process could not be started.
    #[error("Spawn error: {0}")]
    Spawn(String),

    /// The operation was aborted through its cancellation token.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Local filesystem failure outside of path resolution.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Stable machine-readable code for the variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Parse(_) => "PARSE_ERROR",
            Self::Engine(_) => "ENGINE_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Spawn(_) => "SPAWN_ERROR",
            Self::Cancelled(_) => "CANCELLED",
            Self::Io(_) => "IO_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let err = CoreError::NotFound("Dataset path does not exist: /data/x".into());
        assert_eq!(
            err.to_string(),
            "Not found: Dataset path does not exist: /data/x"
        );
    }

    #[test]
    fn codes_are_unique() {
        let errors = [
            CoreError::Config(String::new()),
            CoreError::NotFound(String::new()),
            CoreError::InvalidArgument(String::new()),
            CoreError::Parse(String::new()),
            CoreError::Engine(String::new()),
            CoreError::Timeout(String::new()),
            CoreError::Spawn(String::new()),
            CoreError::Cancelled(String::new()),
            CoreError::Io(std::io::Error::other("x")),
        ];
        let mut codes: Vec<_> = errors.iter().map(CoreError::code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn io_error_converts() {
        let err: CoreError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope").into();
        assert_eq!(err.code(), "IO_ERROR");
    }
}
