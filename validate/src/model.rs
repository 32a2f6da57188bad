//! The static view of a binding graph.
//!
//! Collaborators that discover bindings (annotation processors, code
//! generators, hand-written tables) describe what they found with these
//! records. Nothing here is executed; the runtime counterparts live in
//! `fibre_di`.

use fibre_di::{Component, ComponentTree, Key, ScopeId};
use serde::Serialize;
use std::fmt;

/// How a binding is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
  InjectConstructor,
  Provides,
  Binds,
  Multibinding,
}

/// One declared binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingDescriptor {
  /// Type identity plus qualifier.
  pub key: Key,
  /// Name of the component that owns the binding.
  pub component: String,
  pub scope: Option<ScopeId>,
  /// Where the binding was declared.
  pub source: String,
  pub kind: BindingKind,
}

impl BindingDescriptor {
  pub fn new(key: Key, component: impl Into<String>, source: impl Into<String>) -> Self {
    Self {
      key,
      component: component.into(),
      scope: None,
      source: source.into(),
      kind: BindingKind::InjectConstructor,
    }
  }

  pub fn scoped(mut self, scope: impl Into<ScopeId>) -> Self {
    self.scope = Some(scope.into());
    self
  }

  pub fn kind(mut self, kind: BindingKind) -> Self {
    self.kind = kind;
    self
  }

  pub fn qualifier(&self) -> Option<&str> {
    self.key.qualifier()
  }

  pub fn type_identity(&self) -> &str {
    self.key.type_identity()
  }
}

/// How a requester gets at its dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
  /// Constructed eagerly together with the requester.
  Direct,
  /// Resolved on first use and then kept.
  Deferred,
  /// Resolved anew on every call.
  Provider,
}

impl Access {
  pub fn is_eager(self) -> bool {
    self == Access::Direct
  }
}

/// `requester_type` needs `required_type` to be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRequirement {
  pub required_type: String,
  pub requester_type: String,
  pub qualifier: Option<String>,
  pub access: Access,
  pub source: Option<String>,
}

impl DependencyRequirement {
  pub fn new(required_type: impl Into<String>, requester_type: impl Into<String>) -> Self {
    Self {
      required_type: required_type.into(),
      requester_type: requester_type.into(),
      qualifier: None,
      access: Access::Direct,
      source: None,
    }
  }

  pub fn qualified(mut self, qualifier: impl Into<String>) -> Self {
    self.qualifier = Some(qualifier.into());
    self
  }

  pub fn access(mut self, access: Access) -> Self {
    self.access = access;
    self
  }

  pub fn with_source(mut self, source: impl Into<String>) -> Self {
    self.source = Some(source.into());
    self
  }
}

/// Shape of a declared type, as far as injection cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
  Concrete,
  Abstract,
  Interface,
  Enum,
  /// A type with exactly one process-wide value and no constructor.
  Object,
}

impl TypeKind {
  pub fn is_concrete(self) -> bool {
    self == TypeKind::Concrete
  }
}

impl fmt::Display for TypeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      TypeKind::Concrete => "concrete type",
      TypeKind::Abstract => "abstract type",
      TypeKind::Interface => "interface",
      TypeKind::Enum => "enum",
      TypeKind::Object => "object",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
  Public,
  Internal,
  Private,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
  pub inject: bool,
  pub visibility: Visibility,
  pub source: Option<String>,
}

impl Constructor {
  pub fn inject() -> Self {
    Self {
      inject: true,
      visibility: Visibility::Public,
      source: None,
    }
  }

  pub fn plain() -> Self {
    Self {
      inject: false,
      ..Self::inject()
    }
  }

  pub fn visibility(mut self, visibility: Visibility) -> Self {
    self.visibility = visibility;
    self
  }
}

/// A class that can be built through one of its constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectableClass {
  pub type_name: String,
  pub kind: TypeKind,
  pub constructors: Vec<Constructor>,
  pub scope_annotations: Vec<ScopeId>,
  pub source: String,
}

impl InjectableClass {
  pub fn new(type_name: impl Into<String>, source: impl Into<String>) -> Self {
    Self {
      type_name: type_name.into(),
      kind: TypeKind::Concrete,
      constructors: vec![Constructor::inject()],
      scope_annotations: Vec::new(),
      source: source.into(),
    }
  }

  pub fn inject_constructors(&self) -> impl Iterator<Item = &Constructor> {
    self.constructors.iter().filter(|c| c.inject)
  }
}

/// `fn bind(implementation: Impl) -> Bound`, aliasing an implementation to
/// the type it is requested as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindsDeclaration {
  pub bound_type: String,
  pub implementation_type: String,
  pub implementation_kind: TypeKind,
  pub parameter_count: usize,
  pub is_abstract: bool,
  pub return_type: Option<String>,
  pub scope_annotations: Vec<ScopeId>,
  pub component: String,
  pub source: String,
}

impl BindsDeclaration {
  /// A well-formed declaration binding `implementation` as `bound`.
  pub fn new(
    bound: impl Into<String>,
    implementation: impl Into<String>,
    component: impl Into<String>,
    source: impl Into<String>,
  ) -> Self {
    let bound = bound.into();
    Self {
      return_type: Some(bound.clone()),
      bound_type: bound,
      implementation_type: implementation.into(),
      implementation_kind: TypeKind::Concrete,
      parameter_count: 1,
      is_abstract: true,
      scope_annotations: Vec::new(),
      component: component.into(),
      source: source.into(),
    }
  }
}

/// A function whose return value is the binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidesDeclaration {
  pub provided_type: String,
  pub returns_unit: bool,
  pub is_abstract: bool,
  pub scope_annotations: Vec<ScopeId>,
  pub component: String,
  pub source: String,
}

impl ProvidesDeclaration {
  pub fn new(provided: impl Into<String>, component: impl Into<String>, source: impl Into<String>) -> Self {
    Self {
      provided_type: provided.into(),
      returns_unit: false,
      is_abstract: false,
      scope_annotations: Vec::new(),
      component: component.into(),
      source: source.into(),
    }
  }
}

/// A type application code pulls straight out of a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
  pub component: String,
  pub type_name: String,
  pub source: Option<String>,
}

/// Everything a validation run looks at. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct StaticModel {
  pub components: ComponentTree,
  pub bindings: Vec<BindingDescriptor>,
  pub requirements: Vec<DependencyRequirement>,
  pub injectables: Vec<InjectableClass>,
  pub binds: Vec<BindsDeclaration>,
  pub provides: Vec<ProvidesDeclaration>,
  pub entry_points: Vec<EntryPoint>,
}

impl StaticModel {
  pub fn builder() -> ModelBuilder {
    ModelBuilder::default()
  }

  /// Bindings for exactly `key`.
  pub fn bindings_for<'a>(&'a self, key: &'a Key) -> impl Iterator<Item = &'a BindingDescriptor> + 'a {
    self.bindings.iter().filter(move |b| &b.key == key)
  }

  /// Bindings that provide `type_name` under any qualifier.
  pub fn bindings_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a BindingDescriptor> + 'a {
    self.bindings.iter().filter(move |b| b.type_identity() == type_name)
  }
}

/// Accumulates a [`StaticModel`]. Starts with the built-in components.
#[derive(Debug)]
pub struct ModelBuilder {
  model: StaticModel,
}

impl Default for ModelBuilder {
  fn default() -> Self {
    Self {
      model: StaticModel {
        components: ComponentTree::builtin(),
        ..StaticModel::default()
      },
    }
  }
}

impl ModelBuilder {
  /// Starts from `components` instead of the built-in hierarchy.
  pub fn with_components(mut self, components: ComponentTree) -> Self {
    self.model.components = components;
    self
  }

  pub fn component(mut self, component: Component) -> Self {
    self.model.components.insert(component);
    self
  }

  pub fn binding(mut self, descriptor: BindingDescriptor) -> Self {
    self.model.bindings.push(descriptor);
    self
  }

  /// Shorthand for an unqualified inject-constructor binding.
  pub fn bind(self, type_name: &str, component: &str, source: &str) -> Self {
    self.binding(BindingDescriptor::new(Key::new(type_name, None), component, source))
  }

  pub fn requirement(mut self, requirement: DependencyRequirement) -> Self {
    self.model.requirements.push(requirement);
    self
  }

  /// Shorthand for a direct requirement: `requester` needs `required`.
  pub fn require(self, requester: &str, required: &str) -> Self {
    self.requirement(DependencyRequirement::new(required, requester))
  }

  pub fn injectable(mut self, class: InjectableClass) -> Self {
    self.model.injectables.push(class);
    self
  }

  pub fn binds(mut self, declaration: BindsDeclaration) -> Self {
    self.model.binds.push(declaration);
    self
  }

  pub fn provides(mut self, declaration: ProvidesDeclaration) -> Self {
    self.model.provides.push(declaration);
    self
  }

  pub fn entry_point(mut self, component: &str, type_name: &str) -> Self {
    self.model.entry_points.push(EntryPoint {
      component: component.to_string(),
      type_name: type_name.to_string(),
      source: None,
    });
    self
  }

  pub fn build(self) -> StaticModel {
    self.model
  }
}
