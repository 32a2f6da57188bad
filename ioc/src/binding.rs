//! Construction strategies for a [`Key`].

use crate::container::Container;
use crate::key::{downcast, erase, Instance, Key};
use crate::error::ResolveError;
use crate::hierarchy::ScopeId;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Produces one instance. The container passed in is the one that owns the
/// binding for this resolution, so dependencies resolve against the right
/// scope.
pub type Factory = Arc<dyn Fn(&Container) -> Result<Instance, ResolveError> + Send + Sync>;

/// Folds the instances of every set contribution into the collection value.
pub type SetAssembler = Arc<dyn Fn(&Key, Vec<Instance>) -> Result<Instance, ResolveError> + Send + Sync>;

/// Folds `(map key, instance)` pairs into the collection value.
pub type MapAssembler =
  Arc<dyn Fn(&Key, Vec<(String, Instance)>) -> Result<Instance, ResolveError> + Send + Sync>;

/// How a value for a key is produced and how long it lives.
#[derive(Clone)]
pub enum Binding {
  /// A new instance on every resolution.
  Unscoped(Factory),
  /// One instance per root container, shared with every descendant scope.
  Singleton(Factory),
  /// One instance per container whose active scope is `scope`.
  Scoped { scope: ScopeId, factory: Factory },
  /// Every contribution collected into one set, memoized at the root.
  MultibindingSet {
    contributions: Vec<Factory>,
    assemble: SetAssembler,
  },
  /// Every keyed contribution collected into one map, memoized at the root.
  MultibindingMap {
    contributions: Vec<(String, Factory)>,
    assemble: MapAssembler,
  },
}

impl Binding {
  pub fn unscoped(factory: impl Fn(&Container) -> Result<Instance, ResolveError> + Send + Sync + 'static) -> Self {
    Binding::Unscoped(Arc::new(factory))
  }

  pub fn singleton(factory: impl Fn(&Container) -> Result<Instance, ResolveError> + Send + Sync + 'static) -> Self {
    Binding::Singleton(Arc::new(factory))
  }

  pub fn scoped(
    scope: impl Into<ScopeId>,
    factory: impl Fn(&Container) -> Result<Instance, ResolveError> + Send + Sync + 'static,
  ) -> Self {
    Binding::Scoped {
      scope: scope.into(),
      factory: Arc::new(factory),
    }
  }

  /// A set multibinding whose value is an `Arc<Vec<Instance>>`.
  pub fn set(contributions: Vec<Factory>) -> Self {
    Binding::MultibindingSet {
      contributions,
      assemble: untyped_set_assembler(),
    }
  }

  /// A map multibinding whose value is an `Arc<HashMap<String, Instance>>`.
  pub fn map(contributions: Vec<(String, Factory)>) -> Self {
    Binding::MultibindingMap {
      contributions,
      assemble: untyped_map_assembler(),
    }
  }

  pub fn kind_name(&self) -> &'static str {
    match self {
      Binding::Unscoped(_) => "unscoped",
      Binding::Singleton(_) => "singleton",
      Binding::Scoped { .. } => "scoped",
      Binding::MultibindingSet { .. } => "set multibinding",
      Binding::MultibindingMap { .. } => "map multibinding",
    }
  }
}

impl fmt::Debug for Binding {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Binding::Scoped { scope, .. } => write!(f, "Binding::Scoped({})", scope),
      Binding::MultibindingSet { contributions, .. } => {
        write!(f, "Binding::MultibindingSet({} contributions)", contributions.len())
      }
      Binding::MultibindingMap { contributions, .. } => {
        write!(f, "Binding::MultibindingMap({} contributions)", contributions.len())
      }
      other => write!(f, "Binding::{}", other.kind_name()),
    }
  }
}

/// Wraps a typed factory so its output is stored as an [`Instance`].
pub(crate) fn typed_factory<T, F>(factory: F) -> Factory
where
  T: Any + Send + Sync,
  F: Fn(&Container) -> Result<T, ResolveError> + Send + Sync + 'static,
{
  Arc::new(move |c: &Container| -> Result<Instance, ResolveError> {
    factory(c).map(|value| erase(Arc::new(value)))
  })
}

/// Like [`typed_factory`] for factories that already hand out an `Arc`,
/// which is how trait objects get registered.
pub(crate) fn shared_factory<I, F>(factory: F) -> Factory
where
  I: ?Sized + Any + Send + Sync,
  F: Fn(&Container) -> Result<Arc<I>, ResolveError> + Send + Sync + 'static,
{
  Arc::new(move |c: &Container| -> Result<Instance, ResolveError> { factory(c).map(erase) })
}

pub(crate) fn untyped_set_assembler() -> SetAssembler {
  Arc::new(|_key: &Key, items: Vec<Instance>| -> Result<Instance, ResolveError> {
    Ok(erase(Arc::new(items)))
  })
}

pub(crate) fn untyped_map_assembler() -> MapAssembler {
  Arc::new(|key: &Key, entries: Vec<(String, Instance)>| -> Result<Instance, ResolveError> {
    let mut map = HashMap::with_capacity(entries.len());
    for (map_key, instance) in entries {
      if map.insert(map_key.clone(), instance).is_some() {
        return Err(ResolveError::DuplicateMapKey {
          key: key.clone(),
          map_key,
        });
      }
    }
    Ok(erase(Arc::new(map)))
  })
}

/// Assembles an `Arc<Vec<Arc<T>>>`.
pub(crate) fn typed_set_assembler<T: ?Sized + Any + Send + Sync>() -> SetAssembler {
  Arc::new(|key: &Key, items: Vec<Instance>| -> Result<Instance, ResolveError> {
    let typed = items
      .iter()
      .map(|item| downcast::<T>(key, item))
      .collect::<Result<Vec<Arc<T>>, _>>()?;
    Ok(erase(Arc::new(typed)))
  })
}

/// Assembles an `Arc<HashMap<String, Arc<V>>>`.
pub(crate) fn typed_map_assembler<V: ?Sized + Any + Send + Sync>() -> MapAssembler {
  Arc::new(|key: &Key, entries: Vec<(String, Instance)>| -> Result<Instance, ResolveError> {
    let mut map: HashMap<String, Arc<V>> = HashMap::with_capacity(entries.len());
    for (map_key, instance) in entries {
      let value = downcast::<V>(key, &instance)?;
      if map.insert(map_key.clone(), value).is_some() {
        return Err(ResolveError::DuplicateMapKey {
          key: key.clone(),
          map_key,
        });
      }
    }
    Ok(erase(Arc::new(map)))
  })
}
