//! Components, scopes and their longevity ordering.
//!
//! Both the runtime container (to decide whether a scope may be nested under
//! another) and the static validator (to prove that no binding outlives what
//! it depends on) read the same [`ComponentTree`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Longevity of the root component and the `singleton` scope.
pub const RANK_ROOT: u8 = 2;
/// Longevity of intermediate scopes such as `view_model`. Also the default
/// for custom scopes the tree knows nothing about.
pub const RANK_INTERMEDIATE: u8 = 1;
/// Longevity of leaf scopes such as `navigation_entry`.
pub const RANK_LEAF: u8 = 0;

/// Identity of a lifetime scope.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(Arc<str>);

impl ScopeId {
  pub const SINGLETON: &'static str = "singleton";
  pub const VIEW_MODEL: &'static str = "view_model";
  pub const NAVIGATION_ENTRY: &'static str = "navigation_entry";

  pub fn new(id: impl AsRef<str>) -> Self {
    Self(Arc::from(id.as_ref()))
  }

  pub fn singleton() -> Self {
    Self::new(Self::SINGLETON)
  }

  pub fn view_model() -> Self {
    Self::new(Self::VIEW_MODEL)
  }

  pub fn navigation_entry() -> Self {
    Self::new(Self::NAVIGATION_ENTRY)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for ScopeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "ScopeId({})", self.0)
  }
}

impl fmt::Display for ScopeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for ScopeId {
  fn from(value: &str) -> Self {
    ScopeId::new(value)
  }
}

impl From<String> for ScopeId {
  fn from(value: String) -> Self {
    ScopeId::new(value)
  }
}

/// A named lifetime boundary with at most one parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
  pub name: String,
  pub scope: ScopeId,
  pub parent: Option<String>,
  /// Scopes a binding owned by this component may declare. Defaults to the
  /// component's own scope.
  pub allowed_scopes: Vec<ScopeId>,
  /// Where the component was declared, for diagnostics.
  pub source: Option<String>,
}

impl Component {
  pub const SINGLETON: &'static str = "SingletonComponent";
  pub const VIEW_MODEL: &'static str = "ViewModelComponent";
  pub const NAVIGATION_ENTRY: &'static str = "NavigationEntryComponent";

  pub fn new(name: impl Into<String>, scope: impl Into<ScopeId>) -> Self {
    let scope = scope.into();
    Self {
      name: name.into(),
      allowed_scopes: vec![scope.clone()],
      scope,
      parent: None,
      source: None,
    }
  }

  pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
    self.parent = Some(parent.into());
    self
  }

  pub fn allow_scope(mut self, scope: impl Into<ScopeId>) -> Self {
    let scope = scope.into();
    if !self.allowed_scopes.contains(&scope) {
      self.allowed_scopes.push(scope);
    }
    self
  }

  pub fn with_source(mut self, source: impl Into<String>) -> Self {
    self.source = Some(source.into());
    self
  }

  pub fn singleton() -> Self {
    Self::new(Self::SINGLETON, ScopeId::singleton())
  }

  pub fn view_model() -> Self {
    Self::new(Self::VIEW_MODEL, ScopeId::view_model()).with_parent(Self::SINGLETON)
  }

  pub fn navigation_entry() -> Self {
    Self::new(Self::NAVIGATION_ENTRY, ScopeId::navigation_entry()).with_parent(Self::VIEW_MODEL)
  }

  pub fn allows(&self, scope: &ScopeId) -> bool {
    self.allowed_scopes.contains(scope)
  }
}

/// The declared component hierarchy.
#[derive(Debug, Clone, Default)]
pub struct ComponentTree {
  components: BTreeMap<String, Component>,
  // Declarations in arrival order, duplicates included, so that clashing
  // names can still be reported.
  declared: Vec<Component>,
  rank_overrides: HashMap<ScopeId, u8>,
}

impl ComponentTree {
  pub fn new() -> Self {
    Self::default()
  }

  /// The three built-in components: singleton > view model > navigation entry.
  pub fn builtin() -> Self {
    let mut tree = Self::new();
    tree.insert(Component::singleton());
    tree.insert(Component::view_model());
    tree.insert(Component::navigation_entry());
    tree
  }

  /// Declares a component. A later declaration with the same name replaces
  /// the earlier one for lookups.
  pub fn insert(&mut self, component: Component) {
    self.declared.push(component.clone());
    self.components.insert(component.name.clone(), component);
  }

  /// Overrides the longevity rank of a scope.
  pub fn set_rank(&mut self, scope: impl Into<ScopeId>, rank: u8) {
    self.rank_overrides.insert(scope.into(), rank);
  }

  pub fn get(&self, name: &str) -> Option<&Component> {
    self.components.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.components.contains_key(name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Component> {
    self.components.values()
  }

  /// Every declaration in arrival order, including shadowed duplicates.
  pub fn declarations(&self) -> &[Component] {
    &self.declared
  }

  pub fn parent_of(&self, name: &str) -> Option<&Component> {
    self
      .components
      .get(name)
      .and_then(|c| c.parent.as_deref())
      .and_then(|p| self.components.get(p))
  }

  /// The component owning `scope`, if exactly one is known. When several
  /// components share the scope the first by name wins.
  pub fn component_for_scope(&self, scope: &ScopeId) -> Option<&Component> {
    self.components.values().find(|c| &c.scope == scope)
  }

  /// The first parentless component by name.
  pub fn root(&self) -> Option<&Component> {
    self.components.values().find(|c| c.parent.is_none())
  }

  pub fn is_root(&self, name: &str) -> bool {
    self
      .components
      .get(name)
      .map(|c| c.parent.is_none())
      .unwrap_or(false)
  }

  /// True if walking `component -> parent -> ...` reaches `candidate`.
  pub fn is_ancestor_or_self(&self, candidate: &str, component: &str) -> bool {
    let mut seen = HashSet::new();
    let mut current = Some(component);
    while let Some(name) = current {
      if name == candidate {
        return true;
      }
      // A malformed tree may loop; stop instead of spinning.
      if !seen.insert(name) {
        return false;
      }
      current = self.components.get(name).and_then(|c| c.parent.as_deref());
    }
    false
  }

  /// Longevity of a binding declared in `component` with an optional scope.
  ///
  /// A declared scope decides the rank on its own. Unscoped bindings take the
  /// rank of their component, and the root component is always the longest
  /// lived.
  pub fn longevity_rank(&self, component: &str, scope: Option<&ScopeId>) -> u8 {
    match scope {
      Some(scope) => self.scope_rank(scope),
      None if self.is_root(component) => RANK_ROOT,
      None => match self.components.get(component) {
        Some(c) => self.scope_rank(&c.scope),
        None => RANK_INTERMEDIATE,
      },
    }
  }

  pub fn scope_rank(&self, scope: &ScopeId) -> u8 {
    if let Some(rank) = self.rank_overrides.get(scope) {
      return *rank;
    }
    match scope.as_str() {
      ScopeId::SINGLETON => RANK_ROOT,
      ScopeId::VIEW_MODEL => RANK_INTERMEDIATE,
      ScopeId::NAVIGATION_ENTRY => RANK_LEAF,
      _ => RANK_INTERMEDIATE,
    }
  }

  /// Scope ids declared by more than one component, with every offender.
  pub fn duplicate_scopes(&self) -> Vec<(ScopeId, Vec<String>)> {
    let mut by_scope: BTreeMap<ScopeId, Vec<String>> = BTreeMap::new();
    for component in &self.declared {
      let names = by_scope.entry(component.scope.clone()).or_default();
      if !names.contains(&component.name) {
        names.push(component.name.clone());
      }
    }
    by_scope
      .into_iter()
      .filter(|(_, names)| names.len() > 1)
      .collect()
  }
}
