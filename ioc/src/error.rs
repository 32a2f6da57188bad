use crate::key::Key;
use crate::hierarchy::ScopeId;
use thiserror::Error;

/// Errors raised while resolving a binding from a [`Container`](crate::Container).
///
/// Messages follow the `summary` / `Detail:` / `Fix:` line shape used by the
/// static validator so tooling can parse both the same way.
#[derive(Debug, Error)]
pub enum ResolveError {
  #[error(
    "No binding registered for {key}\n\
     Fix: add a binding for it by (1) marking a constructor of the type as injectable, \
     (2) declaring a provider function that returns it, or \
     (3) binding an implementation to it."
  )]
  UnboundKey { key: Key },

  #[error(
    "{key} is scoped to '{scope}', but no '{scope}' scope is active\n\
     Detail: neither this container nor any of its ancestors has '{scope}' as its active scope.\n\
     Fix: resolve it from a container created with `create_scope_container(\"{scope}\")`, \
     or inside `create_scope(\"{scope}\", ..)`."
  )]
  ScopeNotActive { key: Key, scope: ScopeId },

  #[error(
    "Circular dependency detected at runtime\n\
     Detail: {}\n\
     Fix: this cycle should have been rejected by static validation; break it by \
     injecting one edge as `Deferred<T>` or `Provider<T>`.",
    render_path(.path)
  )]
  CircularResolution { path: Vec<Key> },

  #[error("{key} resolved to a value that is not a `{expected}`")]
  TypeMismatch { key: Key, expected: &'static str },

  #[error(
    "The '{scope}' scope has been disposed\n\
     Fix: create a fresh scope container instead of reusing a disposed one."
  )]
  ScopeDisposed { scope: ScopeId },

  #[error("Map multibinding {key} received more than one contribution for map key '{map_key}'")]
  DuplicateMapKey { key: Key, map_key: String },

  #[error(
    "Cannot open a '{scope}' scope while '{active}' is active\n\
     Detail: the component for '{scope}' must be nested under its parent component.\n\
     Fix: create the intermediate parent scope first."
  )]
  InvalidScopeNesting { scope: ScopeId, active: ScopeId },

  #[error("Factory for {key} failed: {message}")]
  Factory { key: Key, message: String },
}

impl ResolveError {
  /// Convenience for factories that need to report their own failure.
  pub fn factory(key: Key, message: impl Into<String>) -> Self {
    ResolveError::Factory {
      key,
      message: message.into(),
    }
  }
}

/// Errors raised while assembling a binding table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
  #[error("{key} is already bound")]
  DuplicateBinding { key: Key },

  #[error("Map multibinding {key} already has a contribution for map key '{map_key}'")]
  DuplicateMapKey { key: Key, map_key: String },
}

/// Errors raised by the process-wide state lifecycle.
#[derive(Debug, Error)]
pub enum StateError {
  #[error("Process state is already initialized; call reset() before initializing again")]
  AlreadyInitialized,

  #[error("Process state is not initialized; call init() first")]
  NotInitialized,

  #[error(transparent)]
  Register(#[from] RegisterError),
}

fn render_path(path: &[Key]) -> String {
  path
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join(" -> ")
}

/// A specialized `Result` type for resolution.
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
