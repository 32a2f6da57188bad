//! Checks over the whole model and its dependency graph.

use super::deferred_fix;
use crate::graph::Requirement;
use crate::model::{BindingDescriptor, BindingKind};
use crate::pipeline::{Pass, PassContext};
use crate::report::{Diagnostic, DiagnosticKind, Reporter};
use fibre_di::Key;
use std::collections::{BTreeMap, BTreeSet};

pub fn default_passes() -> Vec<Box<dyn Pass>> {
  vec![
    Box::new(KnownComponents),
    Box::new(BindsShape),
    Box::new(ProvidesShape),
    Box::new(UniqueBindings),
    Box::new(UniqueComponentScopes),
    Box::new(AllowedScopes),
    Box::new(DependencyVisibility),
    Box::new(MissingBindings),
    Box::new(Acyclic),
    Box::new(Reachability),
  ]
}

const ADD_BINDING_FIX: &str = "Add an injectable constructor to the type, write a provider function returning it, or bind an implementation to it";

/// Every component a declaration mentions must be declared.
pub struct KnownComponents;

impl Pass for KnownComponents {
  fn name(&self) -> &'static str {
    "known-components"
  }

  fn run(&self, ctx: &PassContext<'_>, reporter: &mut dyn Reporter) {
    let tree = ctx.components;
    // (component, referenced by, source)
    let mut references: Vec<(&str, String, Option<&str>)> = Vec::new();
    for component in tree.iter() {
      if let Some(parent) = &component.parent {
        references.push((parent.as_str(), format!("component {}", component.name), component.source.as_deref()));
      }
    }
    for binding in &ctx.model.bindings {
      references.push((
        binding.component.as_str(),
        format!("the binding for {}", binding.key),
        Some(binding.source.as_str()),
      ));
    }
    for binds in &ctx.model.binds {
      references.push((
        binds.component.as_str(),
        format!("the binds declaration for {}", binds.bound_type),
        Some(binds.source.as_str()),
      ));
    }
    for provides in &ctx.model.provides {
      references.push((
        provides.component.as_str(),
        format!("the provider of {}", provides.provided_type),
        Some(provides.source.as_str()),
      ));
    }
    for entry in &ctx.model.entry_points {
      references.push((
        entry.component.as_str(),
        format!("the entry point {}", entry.type_name),
        entry.source.as_deref(),
      ));
    }

    let mut reported = BTreeSet::new();
    for (component, what, source) in references {
      if tree.contains(component) || !reported.insert((component, source)) {
        continue;
      }
      reporter.error(
        Diagnostic::new(
          DiagnosticKind::UnknownComponent,
          format!("Unknown component {component}"),
        )
        .detail(format!("Referenced by {what}."))
        .fix(format!("Declare {component} or install the declaration in an existing component")),
        source,
      );
    }
  }
}

/// `fn bind(implementation: Impl) -> Bound` with no body.
pub struct BindsShape;

impl Pass for BindsShape {
  fn name(&self) -> &'static str {
    "binds-shape"
  }

  fn run(&self, ctx: &PassContext<'_>, reporter: &mut dyn Reporter) {
    for binds in &ctx.model.binds {
      let mut problems = Vec::new();
      if binds.parameter_count != 1 {
        problems.push(format!("takes {} parameters instead of exactly one", binds.parameter_count));
      }
      if !binds.is_abstract {
        problems.push("has a body".to_string());
      }
      match binds.return_type.as_deref() {
        None => problems.push("returns nothing".to_string()),
        Some(ret) if ret != binds.bound_type => {
          problems.push(format!("returns {ret} instead of {}", binds.bound_type))
        }
        Some(_) => {}
      }
      if binds.implementation_type == binds.bound_type {
        problems.push("binds a type to itself".to_string());
      }
      if problems.is_empty() {
        continue;
      }
      reporter.error(
        Diagnostic::new(
          DiagnosticKind::InvalidBindsShape,
          format!("Invalid binds declaration for {}", binds.bound_type),
        )
        .detail(format!("The declaration {}.", problems.join(", ")))
        .fix(format!(
          "Declare it as an abstract function taking one {} and returning {}",
          binds.implementation_type, binds.bound_type
        )),
        Some(&binds.source),
      );
    }
  }
}

/// A provider function returns a value and has a body.
pub struct ProvidesShape;

impl Pass for ProvidesShape {
  fn name(&self) -> &'static str {
    "provides-shape"
  }

  fn run(&self, ctx: &PassContext<'_>, reporter: &mut dyn Reporter) {
    for provides in &ctx.model.provides {
      let problem = if provides.returns_unit {
        "returns nothing"
      } else if provides.is_abstract {
        "has no body"
      } else {
        continue;
      };
      reporter.error(
        Diagnostic::new(
          DiagnosticKind::InvalidProvidesShape,
          format!("Invalid provider function for {}", provides.provided_type),
        )
        .detail(format!("The function {problem}."))
        .fix("A provider function must have a body that returns the provided value"),
        Some(&provides.source),
      );
    }
  }
}

/// One binding per key per component.
pub struct UniqueBindings;

impl Pass for UniqueBindings {
  fn name(&self) -> &'static str {
    "unique-bindings"
  }

  fn run(&self, ctx: &PassContext<'_>, reporter: &mut dyn Reporter) {
    let mut groups: BTreeMap<(&Key, &str), Vec<&BindingDescriptor>> = BTreeMap::new();
    for binding in ctx.model.bindings.iter().filter(|b| b.kind != BindingKind::Multibinding) {
      groups
        .entry((&binding.key, binding.component.as_str()))
        .or_default()
        .push(binding);
    }

    for ((key, component), bindings) in groups {
      if bindings.len() < 2 {
        continue;
      }
      let sources: Vec<&str> = bindings.iter().map(|b| b.source.as_str()).collect();
      reporter.error(
        Diagnostic::new(
          DiagnosticKind::DuplicateBinding,
          format!("{key} is bound {} times in {component}", bindings.len()),
        )
        .detail(format!("Declared at: {}", sources.join(", ")))
        .fix("Remove all but one binding, or add a qualifier to tell them apart"),
        Some(sources[0]),
      );
    }
  }
}

/// No two components share a scope id.
pub struct UniqueComponentScopes;

impl Pass for UniqueComponentScopes {
  fn name(&self) -> &'static str {
    "unique-component-scopes"
  }

  fn run(&self, ctx: &PassContext<'_>, reporter: &mut dyn Reporter) {
    for (scope, names) in ctx.components.duplicate_scopes() {
      let source = ctx
        .components
        .declarations()
        .iter()
        .find(|c| c.scope == scope)
        .and_then(|c| c.source.as_deref());
      reporter.error(
        Diagnostic::new(
          DiagnosticKind::DuplicateComponentScope,
          format!("Scope {scope} is used by more than one component"),
        )
        .detail(format!("Components: {}", names.join(", ")))
        .fix("Give every component its own scope"),
        source,
      );
    }
  }
}

/// A scoped binding uses a scope its component allows.
pub struct AllowedScopes;

impl Pass for AllowedScopes {
  fn name(&self) -> &'static str {
    "allowed-scopes"
  }

  fn run(&self, ctx: &PassContext<'_>, reporter: &mut dyn Reporter) {
    for binding in &ctx.model.bindings {
      let (Some(scope), Some(component)) = (&binding.scope, ctx.components.get(&binding.component)) else {
        continue;
      };
      if component.allows(scope) {
        continue;
      }
      let allowed: Vec<&str> = component.allowed_scopes.iter().map(|s| s.as_str()).collect();
      reporter.error(
        Diagnostic::new(
          DiagnosticKind::ScopeNotAllowed,
          format!("{} is scoped to {scope}, which {} does not allow", binding.key, component.name),
        )
        .detail(format!("{} allows: {}", component.name, allowed.join(", ")))
        .fix(format!(
          "Install the binding in the component owning {scope}, or use one of the allowed scopes"
        )),
        Some(&binding.source),
      );
    }
  }
}

// A place a requirement is made from: the requester's component and rank.
struct RequesterSite {
  component: String,
  rank: u8,
  scope: String,
}

fn requester_sites(ctx: &PassContext<'_>, requester: &str) -> Vec<RequesterSite> {
  let tree = ctx.components;
  let mut sites: Vec<RequesterSite> = ctx
    .model
    .bindings_of_type(requester)
    .map(|b| RequesterSite {
      component: b.component.clone(),
      rank: tree.longevity_rank(&b.component, b.scope.as_ref()),
      scope: b.scope.as_ref().map(|s| s.to_string()).unwrap_or_else(|| "unscoped".to_string()),
    })
    .collect();
  sites.extend(
    ctx
      .model
      .entry_points
      .iter()
      .filter(|e| e.type_name == requester)
      .map(|e| RequesterSite {
        component: e.component.clone(),
        rank: tree.longevity_rank(&e.component, None),
        scope: "entry point".to_string(),
      }),
  );
  sites
}

/// Every eager dependency is visible from the requester's component and
/// lives at least as long as the requester.
pub struct DependencyVisibility;

impl DependencyVisibility {
  fn check(
    &self,
    ctx: &PassContext<'_>,
    requirement: &Requirement,
    site: &RequesterSite,
    candidates: &[&BindingDescriptor],
    reporter: &mut dyn Reporter,
  ) {
    let tree = ctx.components;
    let required = requirement.required_type();
    let source = requirement.source.as_deref();

    let visible: Vec<&BindingDescriptor> = candidates
      .iter()
      .copied()
      .filter(|b| tree.is_ancestor_or_self(&b.component, &site.component))
      .collect();

    if visible.is_empty() {
      let in_descendant = candidates
        .iter()
        .find(|b| tree.is_ancestor_or_self(&site.component, &b.component));
      let diagnostic = match in_descendant {
        Some(child) => Diagnostic::new(
          DiagnosticKind::ParentDependsOnChild,
          format!(
            "{} in {} depends on {}, which is only bound in the child component {}",
            requirement.requester, site.component, requirement.key, child.component
          ),
        )
        .detail(format!(
          "A component only sees bindings of itself and its ancestors. {} is not available while {} lives outside it.",
          child.component, site.component
        ))
        .fix(format!(
          "Move the binding for {required} into {} or an ancestor. {}",
          site.component,
          deferred_fix(required)
        )),
        None => {
          let owners: BTreeSet<&str> = candidates.iter().map(|b| b.component.as_str()).collect();
          Diagnostic::new(
            DiagnosticKind::InvisibleBinding,
            format!(
              "{} in {} cannot see {}",
              requirement.requester, site.component, requirement.key
            ),
          )
          .detail(format!(
            "{} is bound only in unrelated components: {}",
            requirement.key,
            owners.into_iter().collect::<Vec<_>>().join(", ")
          ))
          .fix(format!(
            "Bind {required} in {} or in an ancestor shared with its current owner",
            site.component
          ))
        }
      };
      reporter.error(diagnostic, source);
      return;
    }

    let longest = visible
      .iter()
      .map(|b| (tree.longevity_rank(&b.component, b.scope.as_ref()), *b))
      .max_by_key(|(rank, _)| *rank);
    if let Some((rank, binding)) = longest {
      if rank < site.rank {
        let scope = binding.scope.as_ref().map(|s| s.to_string()).unwrap_or_else(|| "unscoped".to_string());
        reporter.error(
          Diagnostic::new(
            DiagnosticKind::ScopeLifetimeViolation,
            format!(
              "{} ({}, rank {}) depends on the shorter-lived {} ({}, rank {})",
              requirement.requester, site.scope, site.rank, requirement.key, scope, rank
            ),
          )
          .detail(format!(
            "{} would keep an instance of {required} alive after its scope in {} ends.",
            requirement.requester, binding.component
          ))
          .fix(deferred_fix(required)),
          source,
        );
      }
    }
  }
}

impl Pass for DependencyVisibility {
  fn name(&self) -> &'static str {
    "dependency-visibility"
  }

  fn run(&self, ctx: &PassContext<'_>, reporter: &mut dyn Reporter) {
    let mut seen = BTreeSet::new();
    for requirement in ctx.requirements.iter().filter(|r| r.is_edge()) {
      let candidates: Vec<&BindingDescriptor> = ctx.model.bindings_for(&requirement.key).collect();
      if candidates.is_empty() {
        // Reported by missing-bindings.
        continue;
      }
      for site in requester_sites(ctx, &requirement.requester) {
        if seen.insert((&requirement.key, &requirement.requester, site.component.clone())) {
          self.check(ctx, requirement, &site, &candidates, reporter);
        }
      }
    }
  }
}

/// Every non-exempt requirement has a binding somewhere.
pub struct MissingBindings;

impl Pass for MissingBindings {
  fn name(&self) -> &'static str {
    "missing-bindings"
  }

  fn run(&self, ctx: &PassContext<'_>, reporter: &mut dyn Reporter) {
    let mut seen = BTreeSet::new();
    for requirement in ctx.requirements.iter().filter(|r| !r.exempt) {
      if ctx.model.bindings_for(&requirement.key).next().is_some() {
        continue;
      }
      if !seen.insert((&requirement.key, &requirement.requester)) {
        continue;
      }
      reporter.error(
        Diagnostic::new(
          DiagnosticKind::MissingBinding,
          format!("Missing binding for {}", requirement.key),
        )
        .detail(format!("Required by {}", requirement.requester))
        .fix(ADD_BINDING_FIX),
        requirement.source.as_deref(),
      );
    }
  }
}

/// The eager dependency graph has no cycle.
pub struct Acyclic;

impl Pass for Acyclic {
  fn name(&self) -> &'static str {
    "acyclic"
  }

  fn run(&self, ctx: &PassContext<'_>, reporter: &mut dyn Reporter) {
    let Some(cycle) = ctx.graph.find_cycle() else {
      return;
    };
    let (from, to) = (&cycle[0], &cycle[1]);
    let source = ctx
      .requirements
      .iter()
      .find(|r| &r.requester == from && r.required_type() == to.as_str())
      .and_then(|r| r.source.as_deref());

    reporter.error(
      Diagnostic::new(
        DiagnosticKind::CircularDependency,
        format!("Dependency cycle: {}", cycle.join(" -> ")),
      )
      .detail("Every type in the cycle must be constructed before the next one. Only the first cycle found is reported.")
      .fix(format!(
        "Break the cycle by requesting {to} in {from} through a deferred accessor such as Lazy<{to}>"
      )),
      source,
    );
  }
}

/// Warns about bindings no entry point can reach.
pub struct Reachability;

impl Pass for Reachability {
  fn name(&self) -> &'static str {
    "reachability"
  }

  fn run(&self, ctx: &PassContext<'_>, reporter: &mut dyn Reporter) {
    if !ctx.config.report_unreachable || ctx.model.entry_points.is_empty() {
      return;
    }
    let tree = ctx.components;

    // Deferred uses still count as uses here.
    let mut usage = ctx.graph.clone();
    for requirement in ctx.requirements.iter().filter(|r| !r.exempt) {
      usage.add_edge(&requirement.requester, requirement.required_type());
    }

    let mut reached_by_component: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    for binding in &ctx.model.bindings {
      if binding.kind == BindingKind::Multibinding {
        continue;
      }
      let reached = reached_by_component
        .entry(binding.component.as_str())
        .or_insert_with(|| {
          let roots = ctx
            .model
            .entry_points
            .iter()
            .filter(|e| tree.is_ancestor_or_self(&binding.component, &e.component))
            .map(|e| e.type_name.as_str());
          usage.reachable_from(roots)
        });
      if reached.contains(binding.type_identity()) {
        continue;
      }
      reporter.warn(
        Diagnostic::new(
          DiagnosticKind::UnreachableBinding,
          format!("{} in {} is never used", binding.key, binding.component),
        )
        .detail(format!(
          "No entry point of {} or its descendants depends on it.",
          binding.component
        ))
        .fix("Remove the binding or request it from an entry point"),
        Some(&binding.source),
      );
    }
  }
}
