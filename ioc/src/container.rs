//! The scoped `Container` and the arena its scopes live in.

use crate::binding::Binding;
use crate::key::{downcast, Instance, Key, ResolutionGuard};
use crate::error::{ResolveError, Result};
use crate::hierarchy::{ComponentTree, ScopeId};
use crate::slot::Slot;
use crate::wrappers::{Deferred, Provider};
use dashmap::DashMap;
use generational_arena::{Arena, Index};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// The frozen binding table shared by every container of one tree.
pub(crate) struct BindingTable {
  pub(crate) bindings: HashMap<Key, Binding>,
  pub(crate) components: Option<ComponentTree>,
}

// A child keeps its parent alive for as long as the child is reachable.
#[derive(Clone)]
struct ParentLink {
  index: Index,
  node: Arc<ScopeNode>,
}

/// Per-scope state. Only the cache is mutable. The node, and every instance
/// cached in it, is dropped with the last handle or child that refers to it.
struct ScopeNode {
  scope: ScopeId,
  parent: Option<ParentLink>,
  // One slot per memoized key. The slot is handed out before initialization
  // so the factory runs without holding a shard lock.
  cache: DashMap<Key, Arc<Slot>>,
  disposed: AtomicBool,
}

impl ScopeNode {
  fn new(scope: ScopeId, parent: Option<ParentLink>) -> Self {
    Self {
      scope,
      parent,
      cache: DashMap::new(),
      disposed: AtomicBool::new(false),
    }
  }

  fn is_disposed(&self) -> bool {
    self.disposed.load(Ordering::Acquire)
  }
}

/// Index of the open scopes of one tree. Entries are weak: the arena never
/// keeps a scope alive, it only lets the tree count and look up live ones.
struct ScopeArena {
  nodes: RwLock<Arena<Weak<ScopeNode>>>,
}

impl ScopeArena {
  fn new() -> Self {
    Self {
      nodes: RwLock::new(Arena::new()),
    }
  }

  /// Inserts `node`, dropping entries whose scopes are already gone.
  fn insert(&self, node: &Arc<ScopeNode>) -> Index {
    let mut nodes = self.nodes.write();
    let dead: Vec<Index> = nodes
      .iter()
      .filter(|(_, weak)| weak.strong_count() == 0)
      .map(|(index, _)| index)
      .collect();
    for index in dead {
      nodes.remove(index);
    }
    nodes.insert(Arc::downgrade(node))
  }

  fn remove(&self, index: Index) {
    self.nodes.write().remove(index);
  }

  fn len(&self) -> usize {
    self.nodes.read().iter().filter(|(_, weak)| weak.strong_count() > 0).count()
  }
}

/// A handle on one scope of a container tree.
///
/// The root container is created by [`Registry::build`](crate::Registry::build);
/// child scopes come from [`Container::create_scope_container`]. Every handle
/// shares the same immutable binding table and owns only its scope's cache.
/// Handles are cheap to clone and can be sent across threads.
#[derive(Clone)]
pub struct Container {
  table: Arc<BindingTable>,
  arena: Arc<ScopeArena>,
  index: Index,
  node: Arc<ScopeNode>,
  root_index: Index,
  root: Arc<ScopeNode>,
}

impl std::fmt::Debug for Container {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Container").finish_non_exhaustive()
  }
}

impl Container {
  pub(crate) fn new_root(table: BindingTable, scope: ScopeId) -> Self {
    let arena = Arc::new(ScopeArena::new());
    let node = Arc::new(ScopeNode::new(scope, None));
    let index = arena.insert(&node);
    Self {
      table: Arc::new(table),
      arena,
      index,
      node: node.clone(),
      root_index: index,
      root: node,
    }
  }

  fn handle(&self, index: Index, node: Arc<ScopeNode>) -> Container {
    Container {
      table: self.table.clone(),
      arena: self.arena.clone(),
      index,
      node,
      root_index: self.root_index,
      root: self.root.clone(),
    }
  }

  /// The scope this container was created for. The root uses the root
  /// component's scope, `singleton` by default.
  pub fn active_scope(&self) -> &ScopeId {
    &self.node.scope
  }

  pub fn is_root(&self) -> bool {
    self.node.parent.is_none()
  }

  pub fn is_disposed(&self) -> bool {
    self.node.is_disposed()
  }

  /// The parent scope, unless this is the root or the parent was disposed.
  pub fn parent(&self) -> Option<Container> {
    let link = self.node.parent.as_ref()?;
    if link.node.is_disposed() {
      return None;
    }
    Some(self.handle(link.index, link.node.clone()))
  }

  /// True if a binding is registered for `key`.
  pub fn contains(&self, key: &Key) -> bool {
    self.table.bindings.contains_key(key)
  }

  /// The component hierarchy attached at build time, if any.
  pub fn components(&self) -> Option<&ComponentTree> {
    self.table.components.as_ref()
  }

  /// Number of live scopes in this container tree, root included. A scope is
  /// live until it is disposed or its last handle and child are dropped.
  pub fn live_scopes(&self) -> usize {
    self.arena.len()
  }

  // --- Resolution ---

  /// Resolves `key` to its type-erased instance.
  pub fn get_by_key(&self, key: &Key) -> Result<Instance> {
    self.ensure_live()?;
    let binding = self
      .table
      .bindings
      .get(key)
      .ok_or_else(|| ResolveError::UnboundKey { key: key.clone() })?;

    // Held for the whole resolution, including recursive factory calls.
    let _guard = ResolutionGuard::enter(key)?;

    match binding {
      Binding::Unscoped(factory) => factory(self),
      Binding::Singleton(factory) => {
        let root = self.root_container()?;
        root.memoize(key, || factory(&root))
      }
      Binding::Scoped { scope, factory } => {
        let owner = self.scope_owner(key, scope)?;
        owner.memoize(key, || factory(&owner))
      }
      Binding::MultibindingSet {
        contributions,
        assemble,
      } => {
        let root = self.root_container()?;
        root.memoize(key, || {
          let items = contributions
            .iter()
            .map(|contribution| contribution(&root))
            .collect::<Result<Vec<_>>>()?;
          assemble(key, items)
        })
      }
      Binding::MultibindingMap {
        contributions,
        assemble,
      } => {
        let root = self.root_container()?;
        root.memoize(key, || {
          let entries = contributions
            .iter()
            .map(|(map_key, contribution)| -> Result<(String, Instance)> {
              Ok((map_key.clone(), contribution(&root)?))
            })
            .collect::<Result<Vec<_>>>()?;
          assemble(key, entries)
        })
      }
    }
  }

  /// Resolves an unqualified `T`.
  pub fn get<T: ?Sized + Any + Send + Sync>(&self) -> Result<Arc<T>> {
    self.get_typed(&Key::of::<T>())
  }

  /// Resolves `T` qualified by `name`.
  pub fn get_named<T: ?Sized + Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
    self.get_typed(&Key::named::<T>(name))
  }

  /// Resolves the set multibinding of `T`. The collection is built once per
  /// root container and shared afterwards.
  pub fn get_set<T: ?Sized + Any + Send + Sync>(&self) -> Result<Arc<Vec<Arc<T>>>> {
    self.get_typed(&Key::set_of::<T>(None))
  }

  pub fn get_set_named<T: ?Sized + Any + Send + Sync>(&self, name: &str) -> Result<Arc<Vec<Arc<T>>>> {
    self.get_typed(&Key::set_of::<T>(Some(name)))
  }

  /// Resolves the map multibinding whose values are `V`.
  pub fn get_map<V: ?Sized + Any + Send + Sync>(&self) -> Result<Arc<HashMap<String, Arc<V>>>> {
    self.get_typed(&Key::map_of::<V>(None))
  }

  pub fn get_map_named<V: ?Sized + Any + Send + Sync>(
    &self,
    name: &str,
  ) -> Result<Arc<HashMap<String, Arc<V>>>> {
    self.get_typed(&Key::map_of::<V>(Some(name)))
  }

  /// A factory that resolves `T` from this container each time it is called.
  pub fn provider<T: ?Sized + Any + Send + Sync>(&self) -> Provider<T> {
    Provider::new(self.clone(), Key::of::<T>())
  }

  pub fn provider_named<T: ?Sized + Any + Send + Sync>(&self, name: &str) -> Provider<T> {
    Provider::new(self.clone(), Key::named::<T>(name))
  }

  /// A handle that resolves `T` on first use and keeps the result.
  pub fn deferred<T: ?Sized + Any + Send + Sync>(&self) -> Deferred<T> {
    Deferred::new(self.provider())
  }

  pub fn deferred_named<T: ?Sized + Any + Send + Sync>(&self, name: &str) -> Deferred<T> {
    Deferred::new(self.provider_named(name))
  }

  fn get_typed<T: ?Sized + Any + Send + Sync>(&self, key: &Key) -> Result<Arc<T>> {
    let instance = self.get_by_key(key)?;
    downcast::<T>(key, &instance)
  }

  // --- Scopes ---

  /// Opens a child scope. The child sees every binding of the tree and starts
  /// with an empty cache.
  pub fn create_scope_container(&self, scope: impl Into<ScopeId>) -> Result<Container> {
    let scope = scope.into();
    self.ensure_live()?;
    self.check_nesting(&scope)?;

    let node = Arc::new(ScopeNode::new(
      scope.clone(),
      Some(ParentLink {
        index: self.index,
        node: self.node.clone(),
      }),
    ));
    let index = self.arena.insert(&node);
    tracing::debug!(scope = %scope, parent = %self.node.scope, "Opened scope");
    Ok(self.handle(index, node))
  }

  /// Opens a child scope, runs `block` with it and returns the block's
  /// result. The child is not disposed afterwards; it is released once no
  /// handle to it remains.
  pub fn create_scope<R>(&self, scope: impl Into<ScopeId>, block: impl FnOnce(&Container) -> R) -> Result<R> {
    let child = self.create_scope_container(scope)?;
    Ok(block(&child))
  }

  /// Opens a child scope that is disposed when the returned guard drops.
  pub fn enter_scope(&self, scope: impl Into<ScopeId>) -> Result<ScopeGuard> {
    Ok(ScopeGuard {
      container: self.create_scope_container(scope)?,
    })
  }

  /// Clears this scope's cache and removes it from the tree. Ancestors and
  /// siblings are untouched. Calling it again does nothing.
  pub fn dispose(&self) {
    if self.node.disposed.swap(true, Ordering::AcqRel) {
      return;
    }
    let cached = self.node.cache.len();
    self.node.cache.clear();
    self.arena.remove(self.index);
    tracing::debug!(scope = %self.node.scope, cached, "Disposed scope");
  }

  // --- PRIVATE HELPERS ---

  fn ensure_live(&self) -> Result<()> {
    if self.node.is_disposed() {
      return Err(ResolveError::ScopeDisposed {
        scope: self.node.scope.clone(),
      });
    }
    Ok(())
  }

  fn root_container(&self) -> Result<Container> {
    if self.root.is_disposed() {
      return Err(ResolveError::ScopeDisposed {
        scope: self.root.scope.clone(),
      });
    }
    Ok(self.handle(self.root_index, self.root.clone()))
  }

  /// Walks from this scope towards the root and returns the first container
  /// whose active scope is `scope`.
  fn scope_owner(&self, key: &Key, scope: &ScopeId) -> Result<Container> {
    let mut index = self.index;
    let mut node = self.node.clone();
    loop {
      if node.is_disposed() {
        return Err(ResolveError::ScopeDisposed {
          scope: node.scope.clone(),
        });
      }
      if &node.scope == scope {
        return Ok(self.handle(index, node));
      }
      let link = match &node.parent {
        Some(link) => link.clone(),
        None => {
          return Err(ResolveError::ScopeNotActive {
            key: key.clone(),
            scope: scope.clone(),
          })
        }
      };
      node = link.node;
      index = link.index;
    }
  }

  /// Get-or-insert on this scope's cache. Concurrent first requests for the
  /// same key wait on one slot, so `init` runs at most once per success.
  fn memoize(&self, key: &Key, init: impl FnOnce() -> Result<Instance>) -> Result<Instance> {
    self.ensure_live()?;
    let slot = match self.node.cache.get(key) {
      Some(slot) => slot.value().clone(),
      None => self.node.cache.entry(key.clone()).or_default().value().clone(),
    };

    if let Some(instance) = slot.get() {
      tracing::trace!(key = %key, scope = %self.node.scope, "Cache hit");
      return Ok(instance.clone());
    }

    slot.get_or_try_init(key, || {
      tracing::debug!(key = %key, scope = %self.node.scope, "Creating cached instance");
      init()
    })
  }

  fn check_nesting(&self, scope: &ScopeId) -> Result<()> {
    let Some(tree) = &self.table.components else {
      return Ok(());
    };
    let Some(child) = tree.component_for_scope(scope) else {
      return Ok(());
    };
    let Some(active) = tree.component_for_scope(&self.node.scope) else {
      return Ok(());
    };
    let nested = match child.parent.as_deref() {
      Some(parent) => tree.is_ancestor_or_self(parent, &active.name),
      None => false,
    };
    if nested {
      Ok(())
    } else {
      Err(ResolveError::InvalidScopeNesting {
        scope: scope.clone(),
        active: self.node.scope.clone(),
      })
    }
  }
}

/// A child scope that is disposed when dropped.
pub struct ScopeGuard {
  container: Container,
}

impl ScopeGuard {
  pub fn container(&self) -> &Container {
    &self.container
  }
}

impl Deref for ScopeGuard {
  type Target = Container;

  fn deref(&self) -> &Container {
    &self.container
  }
}

impl Drop for ScopeGuard {
  fn drop(&mut self) {
    self.container.dispose();
  }
}
