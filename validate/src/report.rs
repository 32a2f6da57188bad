//! Diagnostics and the sinks they are reported to.
//!
//! A diagnostic renders as a fixed three-part message that tooling parses:
//!
//! ```text
//! <one-line summary>
//! Detail: <optional detail>
//! Fix: <optional suggested fix>
//! ```

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Warning,
  Error,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Severity::Warning => f.write_str("warning"),
      Severity::Error => f.write_str("error"),
    }
  }
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DiagnosticKind {
  DuplicateBinding,
  MissingBinding,
  CircularDependency,
  ScopeLifetimeViolation,
  ParentDependsOnChild,
  InvisibleBinding,
  UnknownComponent,
  MultipleInjectConstructors,
  NonPublicInjectConstructor,
  NonConcreteInjectable,
  InvalidBindsShape,
  InvalidProvidesShape,
  MultipleScopeAnnotations,
  ScopeNotAllowed,
  DuplicateComponentScope,
  UnreachableBinding,
}

impl DiagnosticKind {
  /// Severity before any escalation from config.
  pub fn default_severity(self) -> Severity {
    match self {
      DiagnosticKind::UnreachableBinding => Severity::Warning,
      _ => Severity::Error,
    }
  }
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
  pub kind: DiagnosticKind,
  pub summary: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub detail: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fix: Option<String>,
}

impl Diagnostic {
  pub fn new(kind: DiagnosticKind, summary: impl Into<String>) -> Self {
    Self {
      kind,
      summary: summary.into(),
      detail: None,
      fix: None,
    }
  }

  pub fn detail(mut self, detail: impl Into<String>) -> Self {
    self.detail = Some(detail.into());
    self
  }

  pub fn fix(mut self, fix: impl Into<String>) -> Self {
    self.fix = Some(fix.into());
    self
  }

  /// The three-part message text.
  pub fn message(&self) -> String {
    self.to_string()
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.summary)?;
    if let Some(detail) = &self.detail {
      write!(f, "\nDetail: {}", detail)?;
    }
    if let Some(fix) = &self.fix {
      write!(f, "\nFix: {}", fix)?;
    }
    Ok(())
  }
}

/// Where passes send their findings.
pub trait Reporter {
  fn error(&mut self, diagnostic: Diagnostic, source: Option<&str>);
  fn warn(&mut self, diagnostic: Diagnostic, source: Option<&str>);

  /// Routes `diagnostic` by its kind's default severity.
  fn report(&mut self, diagnostic: Diagnostic, source: Option<&str>) {
    match diagnostic.kind.default_severity() {
      Severity::Error => self.error(diagnostic, source),
      Severity::Warning => self.warn(diagnostic, source),
    }
  }
}

/// A diagnostic together with its severity and source reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
  pub severity: Severity,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source: Option<String>,
  #[serde(flatten)]
  pub diagnostic: Diagnostic,
}

impl fmt::Display for ReportEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.source {
      Some(source) => write!(f, "{} [{}]: {}", self.severity, source, self.diagnostic),
      None => write!(f, "{}: {}", self.severity, self.diagnostic),
    }
  }
}

/// Keeps every diagnostic in arrival order.
#[derive(Debug, Default)]
pub struct CollectingReporter {
  entries: Vec<ReportEntry>,
}

impl CollectingReporter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn entries(&self) -> &[ReportEntry] {
    &self.entries
  }

  pub fn into_entries(self) -> Vec<ReportEntry> {
    self.entries
  }

  fn push(&mut self, severity: Severity, diagnostic: Diagnostic, source: Option<&str>) {
    self.entries.push(ReportEntry {
      severity,
      source: source.map(str::to_string),
      diagnostic,
    });
  }
}

impl Reporter for CollectingReporter {
  fn error(&mut self, diagnostic: Diagnostic, source: Option<&str>) {
    self.push(Severity::Error, diagnostic, source);
  }

  fn warn(&mut self, diagnostic: Diagnostic, source: Option<&str>) {
    self.push(Severity::Warning, diagnostic, source);
  }
}

/// Forwards to an inner reporter and to `tracing`.
pub struct TracingReporter<R> {
  inner: R,
}

impl<R: Reporter> TracingReporter<R> {
  pub fn new(inner: R) -> Self {
    Self { inner }
  }

  pub fn into_inner(self) -> R {
    self.inner
  }
}

impl<R: Reporter> Reporter for TracingReporter<R> {
  fn error(&mut self, diagnostic: Diagnostic, source: Option<&str>) {
    tracing::error!(kind = ?diagnostic.kind, source = source.unwrap_or("-"), "{}", diagnostic.summary);
    self.inner.error(diagnostic, source);
  }

  fn warn(&mut self, diagnostic: Diagnostic, source: Option<&str>) {
    tracing::warn!(kind = ?diagnostic.kind, source = source.unwrap_or("-"), "{}", diagnostic.summary);
    self.inner.warn(diagnostic, source);
  }
}

/// Counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
  pub errors: usize,
  pub warnings: usize,
  /// Whether there are no errors.
  pub passed: bool,
}

/// The outcome of one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
  pub summary: ReportSummary,
  /// Names of the passes that ran, in order.
  pub passes: Vec<String>,
  pub entries: Vec<ReportEntry>,
}

impl ValidationReport {
  pub fn new(passes: Vec<String>, entries: Vec<ReportEntry>) -> Self {
    let errors = entries.iter().filter(|e| e.severity == Severity::Error).count();
    let warnings = entries.len() - errors;
    Self {
      summary: ReportSummary {
        errors,
        warnings,
        passed: errors == 0,
      },
      passes,
      entries,
    }
  }

  pub fn is_ok(&self) -> bool {
    self.summary.passed
  }

  pub fn errors(&self) -> impl Iterator<Item = &ReportEntry> {
    self.entries.iter().filter(|e| e.severity == Severity::Error)
  }

  pub fn warnings(&self) -> impl Iterator<Item = &ReportEntry> {
    self.entries.iter().filter(|e| e.severity == Severity::Warning)
  }

  /// Entries of one kind.
  pub fn of_kind(&self, kind: DiagnosticKind) -> Vec<&ReportEntry> {
    self.entries.iter().filter(|e| e.diagnostic.kind == kind).collect()
  }

  pub fn to_json(&self) -> String {
    serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
  }

  pub fn to_human_readable(&self) -> String {
    let mut output = String::new();
    output.push_str("=== Binding Validation Report ===\n\n");
    output.push_str(&format!(
      "Errors: {}  Warnings: {}  Passes run: {}\n",
      self.summary.errors,
      self.summary.warnings,
      self.passes.len()
    ));
    for entry in &self.entries {
      output.push('\n');
      output.push_str(&entry.to_string());
      output.push('\n');
    }
    output
  }
}
