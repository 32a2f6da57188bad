//! Checks on single declarations, run before any whole-model pass.

use crate::model::Visibility;
use crate::pipeline::{Pass, PassContext};
use crate::report::{Diagnostic, DiagnosticKind, Reporter};

pub fn default_passes() -> Vec<Box<dyn Pass>> {
  vec![
    Box::new(SingleInjectConstructor),
    Box::new(PublicInjectConstructor),
    Box::new(ConcreteInjectable),
    Box::new(ConcreteBindsImplementation),
    Box::new(SingleScopeAnnotation),
  ]
}

/// An injectable class has at most one inject constructor.
pub struct SingleInjectConstructor;

impl Pass for SingleInjectConstructor {
  fn name(&self) -> &'static str {
    "single-inject-constructor"
  }

  fn run(&self, ctx: &PassContext<'_>, reporter: &mut dyn Reporter) {
    for class in &ctx.model.injectables {
      let count = class.inject_constructors().count();
      if count > 1 {
        reporter.error(
          Diagnostic::new(
            DiagnosticKind::MultipleInjectConstructors,
            format!("{} has {} inject constructors", class.type_name, count),
          )
          .detail("The container cannot choose between them.")
          .fix("Keep the inject marker on exactly one constructor"),
          Some(&class.source),
        );
      }
    }
  }
}

/// The inject constructor must be public.
pub struct PublicInjectConstructor;

impl Pass for PublicInjectConstructor {
  fn name(&self) -> &'static str {
    "public-inject-constructor"
  }

  fn run(&self, ctx: &PassContext<'_>, reporter: &mut dyn Reporter) {
    for class in &ctx.model.injectables {
      for constructor in class.inject_constructors() {
        if constructor.visibility == Visibility::Public {
          continue;
        }
        let source = constructor.source.as_deref().unwrap_or(&class.source);
        reporter.error(
          Diagnostic::new(
            DiagnosticKind::NonPublicInjectConstructor,
            format!("The inject constructor of {} is not public", class.type_name),
          )
          .detail(format!("Its visibility is {:?}.", constructor.visibility))
          .fix("Make the inject constructor public"),
          Some(source),
        );
      }
    }
  }
}

/// Only concrete types can be built from a constructor.
pub struct ConcreteInjectable;

impl Pass for ConcreteInjectable {
  fn name(&self) -> &'static str {
    "concrete-injectable"
  }

  fn run(&self, ctx: &PassContext<'_>, reporter: &mut dyn Reporter) {
    for class in &ctx.model.injectables {
      if class.kind.is_concrete() {
        continue;
      }
      reporter.error(
        Diagnostic::new(
          DiagnosticKind::NonConcreteInjectable,
          format!("{} is an {} and cannot be injectable", class.type_name, class.kind),
        )
        .fix(format!(
          "Mark a concrete implementation as injectable and bind it to {} instead",
          class.type_name
        )),
        Some(&class.source),
      );
    }
  }
}

/// A binds declaration must point at something constructible.
pub struct ConcreteBindsImplementation;

impl Pass for ConcreteBindsImplementation {
  fn name(&self) -> &'static str {
    "concrete-binds-implementation"
  }

  fn run(&self, ctx: &PassContext<'_>, reporter: &mut dyn Reporter) {
    for binds in &ctx.model.binds {
      if binds.implementation_kind.is_concrete() {
        continue;
      }
      reporter.error(
        Diagnostic::new(
          DiagnosticKind::InvalidBindsShape,
          format!(
            "{} is bound to {}, which is an {}",
            binds.bound_type, binds.implementation_type, binds.implementation_kind
          ),
        )
        .fix("Bind to a concrete implementation type"),
        Some(&binds.source),
      );
    }
  }
}

/// A declaration carries at most one scope.
pub struct SingleScopeAnnotation;

impl Pass for SingleScopeAnnotation {
  fn name(&self) -> &'static str {
    "single-scope-annotation"
  }

  fn run(&self, ctx: &PassContext<'_>, reporter: &mut dyn Reporter) {
    let model = ctx.model;
    let classes = model
      .injectables
      .iter()
      .map(|c| (c.type_name.clone(), &c.scope_annotations, &c.source));
    let binds = model
      .binds
      .iter()
      .map(|b| (format!("The binds declaration for {}", b.bound_type), &b.scope_annotations, &b.source));
    let provides = model
      .provides
      .iter()
      .map(|p| (format!("The provider of {}", p.provided_type), &p.scope_annotations, &p.source));

    for (declaration, annotations, source) in classes.chain(binds).chain(provides) {
      if annotations.len() <= 1 {
        continue;
      }
      let scopes: Vec<&str> = annotations.iter().map(|s| s.as_str()).collect();
      reporter.error(
        Diagnostic::new(
          DiagnosticKind::MultipleScopeAnnotations,
          format!("{declaration} declares more than one scope"),
        )
        .detail(format!("Scopes: {}", scopes.join(", ")))
        .fix("Keep exactly one scope annotation"),
        Some(source),
      );
    }
  }
}
