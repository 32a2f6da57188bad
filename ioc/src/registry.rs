//! The registration side of the container.
//!
//! Generated contributors call into a [`Registry`] once each, in any order.
//! Set and map contributions are gathered here and folded into a single
//! multibinding per key when the registry is turned into a root container.

use crate::binding::{
  shared_factory, typed_factory, typed_map_assembler, typed_set_assembler, untyped_map_assembler,
  untyped_set_assembler, Binding, Factory, MapAssembler, SetAssembler,
};
use crate::container::{BindingTable, Container};
use crate::key::{erase, Instance, Key};
use crate::error::{RegisterError, ResolveError};
use crate::hierarchy::{ComponentTree, ScopeId};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Something that adds bindings to a [`Registry`].
///
/// Implemented for every `Fn(&mut Registry) -> Result<(), RegisterError>`, so
/// plain functions and closures can be passed to
/// [`ProcessState::init`](crate::ProcessState::init).
pub trait Contributor {
  fn contribute(&self, registry: &mut Registry) -> Result<(), RegisterError>;
}

impl<F> Contributor for F
where
  F: Fn(&mut Registry) -> Result<(), RegisterError>,
{
  fn contribute(&self, registry: &mut Registry) -> Result<(), RegisterError> {
    self(registry)
  }
}

struct PendingSet {
  contributions: Vec<Factory>,
  assemble: Option<SetAssembler>,
}

struct PendingMap {
  contributions: Vec<(String, Factory)>,
  assemble: Option<MapAssembler>,
}

/// Collects bindings before they are frozen into a shared table.
#[derive(Default)]
pub struct Registry {
  bindings: HashMap<Key, Binding>,
  sets: HashMap<Key, PendingSet>,
  maps: HashMap<Key, PendingMap>,
  components: Option<ComponentTree>,
}

impl Registry {
  /// Creates a new, empty `Registry`.
  pub fn new() -> Self {
    Self::default()
  }

  /// Attaches a component hierarchy. Child scopes are then checked against
  /// it when they are opened, and the root container takes the root
  /// component's scope.
  pub fn with_components(mut self, components: ComponentTree) -> Self {
    self.components = Some(components);
    self
  }

  pub fn contains(&self, key: &Key) -> bool {
    self.bindings.contains_key(key) || self.sets.contains_key(key) || self.maps.contains_key(key)
  }

  // --- Raw registration interface ---

  /// Registers `binding` under `key`. Each key may be bound once.
  pub fn register(&mut self, key: Key, binding: Binding) -> Result<(), RegisterError> {
    if self.contains(&key) {
      return Err(RegisterError::DuplicateBinding { key });
    }
    self.bindings.insert(key, binding);
    Ok(())
  }

  /// Adds one element factory to the set multibinding at `key`.
  pub fn register_set_contribution(&mut self, key: Key, factory: Factory) -> Result<(), RegisterError> {
    self.pending_set(key)?.contributions.push(factory);
    Ok(())
  }

  /// Adds one entry factory to the map multibinding at `key`. Map keys must be
  /// unique per multibinding.
  pub fn register_map_contribution(
    &mut self,
    key: Key,
    map_key: impl Into<String>,
    factory: Factory,
  ) -> Result<(), RegisterError> {
    let map_key = map_key.into();
    let pending = self.pending_map(key.clone())?;
    if pending.contributions.iter().any(|(existing, _)| *existing == map_key) {
      return Err(RegisterError::DuplicateMapKey { key, map_key });
    }
    pending.contributions.push((map_key, factory));
    Ok(())
  }

  fn pending_set(&mut self, key: Key) -> Result<&mut PendingSet, RegisterError> {
    if self.bindings.contains_key(&key) || self.maps.contains_key(&key) {
      return Err(RegisterError::DuplicateBinding { key });
    }
    Ok(self.sets.entry(key).or_insert_with(|| PendingSet {
      contributions: Vec::new(),
      assemble: None,
    }))
  }

  fn pending_map(&mut self, key: Key) -> Result<&mut PendingMap, RegisterError> {
    if self.bindings.contains_key(&key) || self.sets.contains_key(&key) {
      return Err(RegisterError::DuplicateBinding { key });
    }
    Ok(self.maps.entry(key).or_insert_with(|| PendingMap {
      contributions: Vec::new(),
      assemble: None,
    }))
  }

  // --- Instance Registration ---
  pub fn add_instance<T: Any + Send + Sync>(&mut self, instance: T) -> Result<(), RegisterError> {
    self.add_instance_internal(Key::of::<T>(), instance)
  }
  pub fn add_instance_with_name<T: Any + Send + Sync>(
    &mut self,
    name: &str,
    instance: T,
  ) -> Result<(), RegisterError> {
    self.add_instance_internal(Key::named::<T>(name), instance)
  }

  // --- Unscoped Registration ---
  pub fn add_unscoped<T: Any + Send + Sync>(
    &mut self,
    factory: impl Fn(&Container) -> Result<T, ResolveError> + Send + Sync + 'static,
  ) -> Result<(), RegisterError> {
    self.register(Key::of::<T>(), Binding::Unscoped(typed_factory(factory)))
  }
  pub fn add_unscoped_with_name<T: Any + Send + Sync>(
    &mut self,
    name: &str,
    factory: impl Fn(&Container) -> Result<T, ResolveError> + Send + Sync + 'static,
  ) -> Result<(), RegisterError> {
    self.register(Key::named::<T>(name), Binding::Unscoped(typed_factory(factory)))
  }

  // --- Singleton Registration ---
  pub fn add_singleton<T: Any + Send + Sync>(
    &mut self,
    factory: impl Fn(&Container) -> Result<T, ResolveError> + Send + Sync + 'static,
  ) -> Result<(), RegisterError> {
    self.register(Key::of::<T>(), Binding::Singleton(typed_factory(factory)))
  }
  pub fn add_singleton_with_name<T: Any + Send + Sync>(
    &mut self,
    name: &str,
    factory: impl Fn(&Container) -> Result<T, ResolveError> + Send + Sync + 'static,
  ) -> Result<(), RegisterError> {
    self.register(Key::named::<T>(name), Binding::Singleton(typed_factory(factory)))
  }

  // --- Scoped Registration ---
  pub fn add_scoped<T: Any + Send + Sync>(
    &mut self,
    scope: impl Into<ScopeId>,
    factory: impl Fn(&Container) -> Result<T, ResolveError> + Send + Sync + 'static,
  ) -> Result<(), RegisterError> {
    self.register(
      Key::of::<T>(),
      Binding::Scoped {
        scope: scope.into(),
        factory: typed_factory(factory),
      },
    )
  }
  pub fn add_scoped_with_name<T: Any + Send + Sync>(
    &mut self,
    name: &str,
    scope: impl Into<ScopeId>,
    factory: impl Fn(&Container) -> Result<T, ResolveError> + Send + Sync + 'static,
  ) -> Result<(), RegisterError> {
    self.register(
      Key::named::<T>(name),
      Binding::Scoped {
        scope: scope.into(),
        factory: typed_factory(factory),
      },
    )
  }

  // --- Trait Registration ---
  pub fn add_singleton_trait<I: ?Sized + Any + Send + Sync>(
    &mut self,
    factory: impl Fn(&Container) -> Result<Arc<I>, ResolveError> + Send + Sync + 'static,
  ) -> Result<(), RegisterError> {
    self.register(Key::of::<I>(), Binding::Singleton(shared_factory(factory)))
  }
  pub fn add_singleton_trait_with_name<I: ?Sized + Any + Send + Sync>(
    &mut self,
    name: &str,
    factory: impl Fn(&Container) -> Result<Arc<I>, ResolveError> + Send + Sync + 'static,
  ) -> Result<(), RegisterError> {
    self.register(Key::named::<I>(name), Binding::Singleton(shared_factory(factory)))
  }
  pub fn add_scoped_trait<I: ?Sized + Any + Send + Sync>(
    &mut self,
    scope: impl Into<ScopeId>,
    factory: impl Fn(&Container) -> Result<Arc<I>, ResolveError> + Send + Sync + 'static,
  ) -> Result<(), RegisterError> {
    self.register(
      Key::of::<I>(),
      Binding::Scoped {
        scope: scope.into(),
        factory: shared_factory(factory),
      },
    )
  }

  // --- Multibindings ---
  pub fn add_into_set<T: ?Sized + Any + Send + Sync>(
    &mut self,
    factory: impl Fn(&Container) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
  ) -> Result<(), RegisterError> {
    self.add_into_set_internal::<T>(None, shared_factory(factory))
  }
  pub fn add_into_set_with_name<T: ?Sized + Any + Send + Sync>(
    &mut self,
    name: &str,
    factory: impl Fn(&Container) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
  ) -> Result<(), RegisterError> {
    self.add_into_set_internal::<T>(Some(name), shared_factory(factory))
  }
  pub fn add_into_map<V: ?Sized + Any + Send + Sync>(
    &mut self,
    map_key: impl Into<String>,
    factory: impl Fn(&Container) -> Result<Arc<V>, ResolveError> + Send + Sync + 'static,
  ) -> Result<(), RegisterError> {
    self.add_into_map_internal::<V>(None, map_key.into(), shared_factory(factory))
  }
  pub fn add_into_map_with_name<V: ?Sized + Any + Send + Sync>(
    &mut self,
    name: &str,
    map_key: impl Into<String>,
    factory: impl Fn(&Container) -> Result<Arc<V>, ResolveError> + Send + Sync + 'static,
  ) -> Result<(), RegisterError> {
    self.add_into_map_internal::<V>(Some(name), map_key.into(), shared_factory(factory))
  }

  // --- PRIVATE HELPERS ---

  fn add_instance_internal<T: Any + Send + Sync>(&mut self, key: Key, instance: T) -> Result<(), RegisterError> {
    let shared = erase(Arc::new(instance));
    let factory: Factory = Arc::new(move |_: &Container| -> Result<Instance, ResolveError> { Ok(shared.clone()) });
    self.register(key, Binding::Singleton(factory))
  }

  fn add_into_set_internal<T: ?Sized + Any + Send + Sync>(
    &mut self,
    qualifier: Option<&str>,
    factory: Factory,
  ) -> Result<(), RegisterError> {
    let pending = self.pending_set(Key::set_of::<T>(qualifier))?;
    pending.contributions.push(factory);
    pending.assemble.get_or_insert_with(typed_set_assembler::<T>);
    Ok(())
  }

  fn add_into_map_internal<V: ?Sized + Any + Send + Sync>(
    &mut self,
    qualifier: Option<&str>,
    map_key: String,
    factory: Factory,
  ) -> Result<(), RegisterError> {
    let key = Key::map_of::<V>(qualifier);
    self.register_map_contribution(key.clone(), map_key, factory)?;
    if let Some(pending) = self.maps.get_mut(&key) {
      pending.assemble.get_or_insert_with(typed_map_assembler::<V>);
    }
    Ok(())
  }

  /// Runs a contributor against this registry.
  pub fn contribute(&mut self, contributor: &dyn Contributor) -> Result<(), RegisterError> {
    contributor.contribute(self)
  }

  /// Freezes the registrations into a shared table and returns its root
  /// container.
  pub fn build(self) -> Container {
    let Registry {
      mut bindings,
      sets,
      maps,
      components,
    } = self;

    for (key, pending) in sets {
      let assemble = pending.assemble.unwrap_or_else(untyped_set_assembler);
      bindings.insert(
        key,
        Binding::MultibindingSet {
          contributions: pending.contributions,
          assemble,
        },
      );
    }
    for (key, pending) in maps {
      let assemble = pending.assemble.unwrap_or_else(untyped_map_assembler);
      bindings.insert(
        key,
        Binding::MultibindingMap {
          contributions: pending.contributions,
          assemble,
        },
      );
    }

    let root_scope = components
      .as_ref()
      .and_then(ComponentTree::root)
      .map(|c| c.scope.clone())
      .unwrap_or_else(ScopeId::singleton);

    tracing::debug!(
      bindings = bindings.len(),
      root_scope = %root_scope,
      "Building root container"
    );

    Container::new_root(
      BindingTable {
        bindings,
        components,
      },
      root_scope,
    )
  }
}
