//! Binding keys and the per-thread resolution stack.

use crate::error::ResolveError;
use std::any::{type_name, Any};
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

/// A resolved value. The payload is always an `Arc<T>` so that trait objects
/// (`Arc<dyn Trait>`) can be stored next to concrete types.
pub type Instance = Arc<dyn Any + Send + Sync>;

thread_local! {
  // Keys currently being resolved on this thread, in resolution order.
  static RESOLVING_STACK: RefCell<Vec<Key>> = const { RefCell::new(Vec::new()) };
}

/// An RAII guard that tracks in-flight resolutions on the current thread.
///
/// Entering a key that is already on the stack means a factory asked for its
/// own output, directly or transitively. Cached slots would block forever on
/// their own initialization in that case, so the guard refuses to enter and
/// reports the path instead.
pub(crate) struct ResolutionGuard {
  key: Key,
}

impl ResolutionGuard {
  pub(crate) fn enter(key: &Key) -> Result<Self, ResolveError> {
    RESOLVING_STACK.with(|stack| {
      let mut stack = stack.borrow_mut();
      if let Some(pos) = stack.iter().position(|k| k == key) {
        let mut path: Vec<Key> = stack[pos..].to_vec();
        path.push(key.clone());
        return Err(ResolveError::CircularResolution { path });
      }
      stack.push(key.clone());
      Ok(())
    })?;
    Ok(Self { key: key.clone() })
  }
}

impl Drop for ResolutionGuard {
  fn drop(&mut self) {
    RESOLVING_STACK.with(|stack| {
      let mut stack = stack.borrow_mut();
      // Guards drop in LIFO order, but be tolerant of the unexpected.
      if let Some(pos) = stack.iter().rposition(|k| k == &self.key) {
        stack.remove(pos);
      }
    });
  }
}

/// Identifies a binding: a stable type identity plus an optional qualifier.
///
/// The identity is a plain string supplied by whoever registers the binding.
/// The typed helpers use [`std::any::type_name`], which is stable for the
/// lifetime of a build and needs no reflection.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
  type_identity: String,
  qualifier: Option<String>,
}

impl Key {
  pub fn new(type_identity: impl Into<String>, qualifier: Option<&str>) -> Self {
    Self {
      type_identity: type_identity.into(),
      qualifier: qualifier.map(str::to_owned),
    }
  }

  /// Key for an unqualified `T`.
  pub fn of<T: ?Sized + Any>() -> Self {
    Self::new(type_name::<T>(), None)
  }

  /// Key for `T` qualified by `name`.
  pub fn named<T: ?Sized + Any>(name: &str) -> Self {
    Self::new(type_name::<T>(), Some(name))
  }

  /// Synthetic key of the aggregated set whose elements are `T`.
  pub fn set_of<T: ?Sized + Any>(qualifier: Option<&str>) -> Self {
    Self::set_of_identity(type_name::<T>(), qualifier)
  }

  /// Synthetic key of the aggregated map whose values are `V`.
  pub fn map_of<V: ?Sized + Any>(qualifier: Option<&str>) -> Self {
    Self::map_of_identity(type_name::<V>(), qualifier)
  }

  pub fn set_of_identity(element: &str, qualifier: Option<&str>) -> Self {
    Self::new(format!("Set<{}>", element), qualifier)
  }

  pub fn map_of_identity(value: &str, qualifier: Option<&str>) -> Self {
    Self::new(format!("Map<String, {}>", value), qualifier)
  }

  pub fn type_identity(&self) -> &str {
    &self.type_identity
  }

  pub fn qualifier(&self) -> Option<&str> {
    self.qualifier.as_deref()
  }
}

impl fmt::Debug for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.qualifier {
      Some(name) => write!(f, "Key({}, Named({}))", self.type_identity, name),
      None => write!(f, "Key({})", self.type_identity),
    }
  }
}

impl fmt::Display for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.qualifier {
      Some(name) => write!(f, "@Named(\"{}\") {}", name, self.type_identity),
      None => f.write_str(&self.type_identity),
    }
  }
}

/// Wraps a typed value into an [`Instance`].
pub(crate) fn erase<T: ?Sized + Any + Send + Sync>(value: Arc<T>) -> Instance {
  Arc::new(value)
}

/// Recovers the typed `Arc<T>` stored inside an [`Instance`].
pub(crate) fn downcast<T: ?Sized + Any + Send + Sync>(
  key: &Key,
  instance: &Instance,
) -> Result<Arc<T>, ResolveError> {
  instance
    .downcast_ref::<Arc<T>>()
    .cloned()
    .ok_or_else(|| ResolveError::TypeMismatch {
      key: key.clone(),
      expected: type_name::<T>(),
    })
}
