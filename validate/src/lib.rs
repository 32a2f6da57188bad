//! # Fibre DI Validate
//!
//! Ahead-of-time checks for `fibre_di` binding graphs.
//!
//! Whatever discovers bindings (a code generator, an annotation scanner, a
//! hand-written table) describes them as a [`StaticModel`]: binding
//! descriptors, dependency requirements and the shapes of the declarations
//! behind them. The [`Validator`] runs two ordered phases of named passes
//! over that model and collects every finding instead of stopping at the
//! first:
//!
//! - **Structural** passes look at one declaration at a time (a single public
//!   inject constructor, concrete injectable and bound types, one scope).
//! - **Model** passes look at the whole model and its dependency graph
//!   (known components, unique bindings and scopes, visibility and lifetime
//!   of every dependency, missing bindings, cycles, unreachable bindings).
//!
//! ## Quick Start
//!
//! ```
//! use fibre_di::Component;
//! use fibre_di_validate::{DiagnosticKind, StaticModel, Validator};
//!
//! let model = StaticModel::builder()
//!   .bind("Repo", Component::SINGLETON, "repo.rs:3")
//!   .bind("Service", Component::SINGLETON, "service.rs:7")
//!   .require("Service", "Repo")
//!   .require("Repo", "Service")
//!   .build();
//!
//! let report = Validator::default().validate(&model);
//! assert!(!report.is_ok());
//!
//! let cycles = report.of_kind(DiagnosticKind::CircularDependency);
//! assert_eq!(cycles.len(), 1);
//! assert!(cycles[0].diagnostic.summary.contains("Repo -> Service -> Repo"));
//! ```

mod config;
mod error;
mod graph;
mod model;
pub mod passes;
mod pipeline;
mod report;

pub use crate::config::ValidatorConfig;
pub use crate::error::{ConfigError, Result};
pub use crate::graph::{DependencyGraph, GraphBuilder, Requirement};
pub use crate::model::{
  Access, BindingDescriptor, BindingKind, BindsDeclaration, Constructor, DependencyRequirement,
  EntryPoint, InjectableClass, ModelBuilder, ProvidesDeclaration, StaticModel, TypeKind,
  Visibility,
};
pub use crate::pipeline::{Pass, PassContext, Phase, Validator};
pub use crate::report::{
  CollectingReporter, Diagnostic, DiagnosticKind, ReportEntry, ReportSummary, Reporter,
  Severity, TracingReporter, ValidationReport,
};
