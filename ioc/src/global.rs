//! Process-wide container state with an explicit init/reset lifecycle.

use crate::container::Container;
use crate::error::StateError;
use crate::hierarchy::ComponentTree;
use crate::registry::{Contributor, Registry};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;

type ResetListener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct StateInner {
  root: Option<Container>,
  listeners: Vec<ResetListener>,
}

/// Owns the current root container and the callbacks to run on reset.
///
/// Every transition goes through one lock. Applications usually reach the
/// shared instance through [`global()`], but tests and embedders can own a
/// `ProcessState` of their own and pass it where it is needed.
#[derive(Default)]
pub struct ProcessState {
  inner: Mutex<StateInner>,
}

impl ProcessState {
  pub fn new() -> Self {
    Self::default()
  }

  /// Runs every contributor against a fresh registry and installs the
  /// resulting root container.
  ///
  /// Initializing twice without a [`reset`](ProcessState::reset) in between is
  /// an error; the existing root is left in place.
  pub fn init(&self, contributors: &[&dyn Contributor]) -> Result<Container, StateError> {
    self.init_with(Registry::new(), contributors)
  }

  /// Like [`init`](ProcessState::init) with a component hierarchy attached.
  pub fn init_with_components(
    &self,
    components: ComponentTree,
    contributors: &[&dyn Contributor],
  ) -> Result<Container, StateError> {
    self.init_with(Registry::new().with_components(components), contributors)
  }

  fn init_with(&self, mut registry: Registry, contributors: &[&dyn Contributor]) -> Result<Container, StateError> {
    let mut inner = self.inner.lock();
    if inner.root.is_some() {
      return Err(StateError::AlreadyInitialized);
    }
    for contributor in contributors {
      registry.contribute(*contributor)?;
    }
    let root = registry.build();
    inner.root = Some(root.clone());
    tracing::debug!(contributors = contributors.len(), "Process state initialized");
    Ok(root)
  }

  /// The current root container.
  pub fn root(&self) -> Result<Container, StateError> {
    self.inner.lock().root.clone().ok_or(StateError::NotInitialized)
  }

  pub fn is_initialized(&self) -> bool {
    self.inner.lock().root.is_some()
  }

  /// Disposes the root container, forgets it and notifies reset listeners.
  /// Listeners run after the lock is released so they may call back in.
  pub fn reset(&self) {
    let (root, listeners) = {
      let mut inner = self.inner.lock();
      (inner.root.take(), inner.listeners.clone())
    };
    match root {
      Some(root) => {
        root.dispose();
        tracing::debug!(listeners = listeners.len(), "Process state reset");
      }
      None => tracing::warn!("reset() called on uninitialized process state"),
    }
    for listener in listeners {
      listener();
    }
  }

  /// Registers a callback to run on every [`reset`](ProcessState::reset).
  pub fn add_reset_listener(&self, listener: impl Fn() + Send + Sync + 'static) {
    self.inner.lock().listeners.push(Arc::new(listener));
  }
}

// The process-wide state. It will be created on its first access in a
// thread-safe manner.
static GLOBAL_STATE: Lazy<ProcessState> = Lazy::new(ProcessState::new);

/// Provides a reference to the process-wide state.
///
/// # Examples
///
/// ```
/// use fibre_di::{global, Registry, RegisterError};
///
/// fn app_bindings(registry: &mut Registry) -> Result<(), RegisterError> {
///   registry.add_instance(String::from("Hello from global!"))
/// }
///
/// global().init(&[&app_bindings]).unwrap();
/// let greeting = global().root().unwrap().get::<String>().unwrap();
/// assert_eq!(*greeting, "Hello from global!");
/// global().reset();
/// ```
pub fn global() -> &'static ProcessState {
  &GLOBAL_STATE
}
