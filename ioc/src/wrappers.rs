//! Deferred access to a binding.
//!
//! Both wrappers break eager construction cycles: the static graph builder
//! leaves their edges out, and at run time the lookup only happens when the
//! wrapper is asked for a value.

use crate::container::Container;
use crate::error::Result;
use crate::key::{downcast, Key};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Resolves `T` from its container on every call to [`get`](Provider::get).
///
/// The provider caches nothing itself; whether two calls return the same
/// instance depends only on the binding's kind.
pub struct Provider<T: ?Sized> {
  container: Container,
  key: Key,
  _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Any + Send + Sync> Provider<T> {
  pub(crate) fn new(container: Container, key: Key) -> Self {
    Self {
      container,
      key,
      _marker: PhantomData,
    }
  }

  pub fn get(&self) -> Result<Arc<T>> {
    let instance = self.container.get_by_key(&self.key)?;
    downcast::<T>(&self.key, &instance)
  }

  pub fn key(&self) -> &Key {
    &self.key
  }
}

impl<T: ?Sized> Clone for Provider<T> {
  fn clone(&self) -> Self {
    Self {
      container: self.container.clone(),
      key: self.key.clone(),
      _marker: PhantomData,
    }
  }
}

impl<T: ?Sized> fmt::Debug for Provider<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Provider").field("key", &self.key).finish()
  }
}

/// Resolves `T` the first time [`get`](Deferred::get) succeeds and hands out
/// that same instance afterwards.
pub struct Deferred<T: ?Sized> {
  provider: Provider<T>,
  value: OnceCell<Arc<T>>,
}

impl<T: ?Sized + Any + Send + Sync> Deferred<T> {
  pub(crate) fn new(provider: Provider<T>) -> Self {
    Self {
      provider,
      value: OnceCell::new(),
    }
  }

  pub fn get(&self) -> Result<Arc<T>> {
    self.value.get_or_try_init(|| self.provider.get()).cloned()
  }

  /// True once a value has been resolved.
  pub fn is_resolved(&self) -> bool {
    self.value.get().is_some()
  }
}

impl<T: ?Sized> fmt::Debug for Deferred<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Deferred")
      .field("key", &self.provider.key)
      .field("resolved", &self.value.get().is_some())
      .finish()
  }
}
