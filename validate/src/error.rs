use thiserror::Error;

/// Errors raised while locating or loading a [`ValidatorConfig`](crate::ValidatorConfig).
///
/// Validation findings are never errors of this kind; they are reported as
/// [`Diagnostic`](crate::Diagnostic)s.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Configuration file not found: {0}")]
  NotFound(String),

  #[error("Failed to read configuration file: {0}")]
  Read(#[from] std::io::Error),

  #[error("Failed to parse configuration: {0}")]
  Parse(String),
}

/// A specialized `Result` type for `fibre_di_validate` configuration loading.
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
