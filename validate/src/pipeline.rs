//! Ordered validation phases made of named passes.

use crate::config::ValidatorConfig;
use crate::graph::{DependencyGraph, GraphBuilder, Requirement};
use crate::model::StaticModel;
use crate::passes::{model as model_passes, structural};
use crate::report::{CollectingReporter, Diagnostic, Reporter, ValidationReport};
use fibre_di::{ComponentTree, ScopeId};

/// The two phases, run in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  /// Checks on individual declarations.
  Structural,
  /// Checks on the model as a whole and its dependency graph.
  Model,
}

/// Everything a pass may read. Passes never share mutable state.
pub struct PassContext<'a> {
  pub model: &'a StaticModel,
  pub config: &'a ValidatorConfig,
  /// The model's component tree with configured rank overrides applied.
  pub components: &'a ComponentTree,
  pub requirements: &'a [Requirement],
  pub graph: &'a DependencyGraph,
}

/// One named check.
pub trait Pass: Send + Sync {
  /// Stable name used in config and reports.
  fn name(&self) -> &'static str;

  fn run(&self, ctx: &PassContext<'_>, reporter: &mut dyn Reporter);
}

/// Runs the structural phase, then the model phase, collecting every
/// diagnostic instead of stopping at the first.
pub struct Validator {
  config: ValidatorConfig,
  structural: Vec<Box<dyn Pass>>,
  model: Vec<Box<dyn Pass>>,
}

impl Default for Validator {
  fn default() -> Self {
    Self::new(ValidatorConfig::default())
  }
}

impl Validator {
  /// A validator with every built-in pass.
  pub fn new(config: ValidatorConfig) -> Self {
    Self {
      config,
      structural: structural::default_passes(),
      model: model_passes::default_passes(),
    }
  }

  /// A validator with no passes at all.
  pub fn empty(config: ValidatorConfig) -> Self {
    Self {
      config,
      structural: Vec::new(),
      model: Vec::new(),
    }
  }

  /// Appends `pass` to the end of `phase`.
  pub fn with_pass(mut self, phase: Phase, pass: impl Pass + 'static) -> Self {
    match phase {
      Phase::Structural => self.structural.push(Box::new(pass)),
      Phase::Model => self.model.push(Box::new(pass)),
    }
    self
  }

  pub fn config(&self) -> &ValidatorConfig {
    &self.config
  }

  /// Pass names in run order, disabled ones included.
  pub fn pass_names(&self) -> Vec<&'static str> {
    self.structural.iter().chain(&self.model).map(|p| p.name()).collect()
  }

  /// Validates `model` and returns the collected report.
  pub fn validate(&self, model: &StaticModel) -> ValidationReport {
    let mut reporter = CollectingReporter::new();
    let passes = self.run(model, &mut reporter);
    ValidationReport::new(passes, reporter.into_entries())
  }

  /// Validates `model` into `reporter` and returns the names of the passes
  /// that ran.
  pub fn run(&self, model: &StaticModel, reporter: &mut dyn Reporter) -> Vec<String> {
    let mut components = model.components.clone();
    for (scope, rank) in &self.config.longevity {
      components.set_rank(ScopeId::new(scope), *rank);
    }
    let requirements: Vec<Requirement> = model
      .requirements
      .iter()
      .map(|r| Requirement::from_declared(r, &self.config))
      .collect();
    let graph = GraphBuilder::new(&self.config).build_from(model, &requirements);

    let ctx = PassContext {
      model,
      config: &self.config,
      components: &components,
      requirements: &requirements,
      graph: &graph,
    };
    let mut reporter = Escalating {
      inner: reporter,
      warnings_as_errors: self.config.warnings_as_errors,
    };

    let mut ran = Vec::new();
    for (phase, passes) in [(Phase::Structural, &self.structural), (Phase::Model, &self.model)] {
      tracing::debug!(?phase, passes = passes.len(), "Starting validation phase");
      for pass in passes {
        if !self.config.is_pass_enabled(pass.name()) {
          tracing::debug!(pass = pass.name(), "Pass disabled by config");
          continue;
        }
        tracing::debug!(pass = pass.name(), "Running pass");
        pass.run(&ctx, &mut reporter);
        ran.push(pass.name().to_string());
      }
    }
    tracing::debug!(passes = ran.len(), "Validation finished");
    ran
  }
}

// Reports warnings as errors when configured to.
struct Escalating<'r> {
  inner: &'r mut dyn Reporter,
  warnings_as_errors: bool,
}

impl Reporter for Escalating<'_> {
  fn error(&mut self, diagnostic: Diagnostic, source: Option<&str>) {
    self.inner.error(diagnostic, source);
  }

  fn warn(&mut self, diagnostic: Diagnostic, source: Option<&str>) {
    if self.warnings_as_errors {
      self.inner.error(diagnostic, source);
    } else {
      self.inner.warn(diagnostic, source);
    }
  }
}
