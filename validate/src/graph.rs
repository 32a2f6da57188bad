//! Dependency graph construction and cycle detection.

use crate::config::ValidatorConfig;
use crate::model::{Access, DependencyRequirement, StaticModel};
use fibre_di::Key;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// A requirement after wrapper types have been peeled off.
///
/// `Lazy<Repo>` becomes a deferred requirement on `Repo`; exempt types are
/// flagged so no pass asks for a binding for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
  pub key: Key,
  pub requester: String,
  pub access: Access,
  pub exempt: bool,
  pub source: Option<String>,
}

impl Requirement {
  pub fn from_declared(requirement: &DependencyRequirement, config: &ValidatorConfig) -> Self {
    let (required, access) = match config.deferred_wrapper(&requirement.required_type) {
      Some(("Provider", inner)) => (inner, Access::Provider),
      Some((_, inner)) if requirement.access.is_eager() => (inner, Access::Deferred),
      Some((_, inner)) => (inner, requirement.access),
      None => (requirement.required_type.as_str(), requirement.access),
    };
    Self {
      key: Key::new(required, requirement.qualifier.as_deref()),
      requester: requirement.requester_type.clone(),
      access,
      exempt: config.is_exempt(required),
      source: requirement.source.clone(),
    }
  }

  pub fn required_type(&self) -> &str {
    self.key.type_identity()
  }

  /// True if the requirement forces eager construction of its target.
  pub fn is_edge(&self) -> bool {
    self.access.is_eager() && !self.exempt
  }
}

/// Builds the adjacency `requester -> {required}` of a model.
pub struct GraphBuilder<'a> {
  config: &'a ValidatorConfig,
}

impl<'a> GraphBuilder<'a> {
  pub fn new(config: &'a ValidatorConfig) -> Self {
    Self { config }
  }

  pub fn build(&self, model: &StaticModel) -> DependencyGraph {
    let requirements: Vec<Requirement> = model
      .requirements
      .iter()
      .map(|r| Requirement::from_declared(r, self.config))
      .collect();
    self.build_from(model, &requirements)
  }

  /// Like [`build`](Self::build) over requirements that were already
  /// normalized.
  pub fn build_from(&self, model: &StaticModel, requirements: &[Requirement]) -> DependencyGraph {
    let mut graph = DependencyGraph::default();

    for binding in &model.bindings {
      graph.add_node(binding.type_identity());
    }
    for requirement in requirements.iter().filter(|r| r.is_edge()) {
      graph.add_edge(&requirement.requester, requirement.required_type());
    }
    // A binds declaration makes the bound type construct its implementation.
    for binds in &model.binds {
      if !self.config.is_exempt(&binds.implementation_type) {
        graph.add_edge(&binds.bound_type, &binds.implementation_type);
      }
    }

    tracing::debug!(
      nodes = graph.node_count(),
      edges = graph.edge_count(),
      "Built dependency graph"
    );
    graph
  }
}

/// Adjacency over type identities. Iteration is in sorted order, so every
/// traversal is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
  edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
  pub fn from_edges<'e>(edges: impl IntoIterator<Item = (&'e str, &'e str)>) -> Self {
    let mut graph = Self::default();
    for (from, to) in edges {
      graph.add_edge(from, to);
    }
    graph
  }

  pub fn add_node(&mut self, node: &str) {
    self.edges.entry(node.to_string()).or_default();
  }

  pub fn add_edge(&mut self, from: &str, to: &str) {
    self.add_node(to);
    self.edges.entry(from.to_string()).or_default().insert(to.to_string());
  }

  pub fn nodes(&self) -> impl Iterator<Item = &str> {
    self.edges.keys().map(String::as_str)
  }

  pub fn dependencies_of(&self, node: &str) -> impl Iterator<Item = &str> {
    self.edges.get(node).into_iter().flatten().map(String::as_str)
  }

  pub fn has_edge(&self, from: &str, to: &str) -> bool {
    self.edges.get(from).map(|deps| deps.contains(to)).unwrap_or(false)
  }

  pub fn node_count(&self) -> usize {
    self.edges.len()
  }

  pub fn edge_count(&self) -> usize {
    self.edges.values().map(BTreeSet::len).sum()
  }

  /// The first cycle found by a depth-first search in sorted node order, as
  /// the path from the repeated node back to itself: `[A, B, A]`.
  ///
  /// At least one cycle is reported when any exist, not necessarily all.
  pub fn find_cycle(&self) -> Option<Vec<String>> {
    let mut visited = HashSet::new();
    let mut path = Vec::new();
    self
      .edges
      .keys()
      .find_map(|node| self.visit(node, &mut visited, &mut path))
  }

  fn visit<'g>(
    &'g self,
    node: &'g str,
    visited: &mut HashSet<&'g str>,
    path: &mut Vec<&'g str>,
  ) -> Option<Vec<String>> {
    if let Some(start) = path.iter().position(|n| *n == node) {
      let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
      cycle.push(node.to_string());
      return Some(cycle);
    }
    if !visited.insert(node) {
      return None;
    }

    path.push(node);
    if let Some(deps) = self.edges.get(node) {
      for dep in deps {
        if let Some(cycle) = self.visit(dep, visited, path) {
          return Some(cycle);
        }
      }
    }
    path.pop();
    None
  }

  /// Every node reachable from `roots`, roots included.
  pub fn reachable_from<'r>(&self, roots: impl IntoIterator<Item = &'r str>) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut queue: VecDeque<String> = roots.into_iter().map(str::to_string).collect();
    while let Some(node) = queue.pop_front() {
      if !seen.insert(node.clone()) {
        continue;
      }
      for dep in self.dependencies_of(&node) {
        if !seen.contains(dep) {
          queue.push_back(dep.to_string());
        }
      }
    }
    seen
  }
}
