use fibre_di::{Component, ComponentTree, Key, ScopeId};
use fibre_di_validate::{
  Access, BindingDescriptor, BindingKind, BindsDeclaration, DependencyRequirement, DiagnosticKind,
  ProvidesDeclaration, StaticModel, ValidationReport, Validator,
};
use pretty_assertions::assert_eq;

const ROOT: &str = Component::SINGLETON;
const SCREEN: &str = Component::VIEW_MODEL;
const ENTRY: &str = Component::NAVIGATION_ENTRY;

fn validate(model: &StaticModel) -> ValidationReport {
  Validator::default().validate(model)
}

fn kinds(report: &ValidationReport) -> Vec<DiagnosticKind> {
  report.entries.iter().map(|e| e.diagnostic.kind).collect()
}

fn singleton(type_name: &str, source: &str) -> BindingDescriptor {
  BindingDescriptor::new(Key::new(type_name, None), ROOT, source).scoped(ScopeId::singleton())
}

// --- Cycles ---

#[test]
fn two_node_cycle_is_reported_once_with_both_types() {
  let model = StaticModel::builder()
    .bind("A", ROOT, "a.rs:1")
    .bind("B", ROOT, "b.rs:1")
    .require("A", "B")
    .require("B", "A")
    .build();

  let report = validate(&model);
  assert_eq!(kinds(&report), vec![DiagnosticKind::CircularDependency]);

  let cycle = &report.entries[0].diagnostic;
  assert_eq!(cycle.summary, "Dependency cycle: A -> B -> A");
  assert!(cycle.fix.as_deref().unwrap().contains("Lazy<B>"));
}

#[test]
fn deferred_edge_breaks_the_cycle() {
  let model = StaticModel::builder()
    .bind("A", ROOT, "a.rs:1")
    .bind("B", ROOT, "b.rs:1")
    .require("A", "Lazy<B>")
    .requirement(DependencyRequirement::new("A", "B").access(Access::Provider))
    .build();

  assert!(validate(&model).is_ok());
}

#[test]
fn only_the_first_cycle_is_reported() {
  let model = StaticModel::builder()
    .bind("A", ROOT, "a.rs:1")
    .bind("B", ROOT, "b.rs:1")
    .bind("X", ROOT, "x.rs:1")
    .bind("Y", ROOT, "y.rs:1")
    .require("A", "B")
    .require("B", "A")
    .require("X", "Y")
    .require("Y", "X")
    .build();

  let report = validate(&model);
  assert_eq!(report.of_kind(DiagnosticKind::CircularDependency).len(), 1);
}

#[test]
fn binds_declarations_take_part_in_cycles() {
  use fibre_di_validate::BindsDeclaration;

  let model = StaticModel::builder()
    .bind("Repo", ROOT, "m.rs:1")
    .bind("SqlRepo", ROOT, "sql.rs:1")
    .binds(BindsDeclaration::new("Repo", "SqlRepo", ROOT, "m.rs:1"))
    .require("SqlRepo", "Repo")
    .build();

  let report = validate(&model);
  assert_eq!(kinds(&report), vec![DiagnosticKind::CircularDependency]);
  assert_eq!(
    report.entries[0].diagnostic.summary,
    "Dependency cycle: Repo -> SqlRepo -> Repo"
  );
}

// --- Duplicates ---

#[test]
fn duplicate_binding_is_reported_once_listing_both_sources() {
  let model = StaticModel::builder()
    .bind("Repo", ROOT, "first.rs:10")
    .bind("Repo", ROOT, "second.rs:20")
    .build();

  let report = validate(&model);
  assert_eq!(kinds(&report), vec![DiagnosticKind::DuplicateBinding]);
  let detail = report.entries[0].diagnostic.detail.clone().unwrap();
  assert!(detail.contains("first.rs:10"));
  assert!(detail.contains("second.rs:20"));
}

#[test]
fn same_key_in_different_components_or_qualifiers_is_fine() {
  let model = StaticModel::builder()
    .bind("Repo", ROOT, "first.rs:10")
    .bind("Repo", SCREEN, "second.rs:20")
    .binding(BindingDescriptor::new(Key::new("Repo", Some("cached")), ROOT, "third.rs:30"))
    .binding(
      BindingDescriptor::new(Key::set_of_identity("Plugin", None), ROOT, "p1.rs:1").kind(BindingKind::Multibinding),
    )
    .binding(
      BindingDescriptor::new(Key::set_of_identity("Plugin", None), ROOT, "p2.rs:1").kind(BindingKind::Multibinding),
    )
    .build();

  assert!(validate(&model).of_kind(DiagnosticKind::DuplicateBinding).is_empty());
}

// --- Visibility and lifetimes ---

#[test]
fn root_singleton_depending_on_child_only_type_is_rejected() {
  let model = StaticModel::builder()
    .binding(singleton("Analytics", "analytics.rs:1"))
    .binding(
      BindingDescriptor::new(Key::new("ScreenState", None), SCREEN, "screen.rs:1").scoped(ScopeId::view_model()),
    )
    .requirement(DependencyRequirement::new("ScreenState", "Analytics").with_source("analytics.rs:4"))
    .build();

  let report = validate(&model);
  assert_eq!(kinds(&report), vec![DiagnosticKind::ParentDependsOnChild]);

  let entry = &report.entries[0];
  assert_eq!(entry.source.as_deref(), Some("analytics.rs:4"));
  assert!(entry.diagnostic.summary.contains(ROOT));
  assert!(entry.diagnostic.summary.contains(SCREEN));
  assert!(entry.diagnostic.fix.as_deref().unwrap().contains("Lazy<ScreenState>"));
}

#[test]
fn child_depending_on_ancestor_is_clean() {
  let model = StaticModel::builder()
    .binding(singleton("Analytics", "analytics.rs:1"))
    .binding(
      BindingDescriptor::new(Key::new("ScreenState", None), SCREEN, "screen.rs:1").scoped(ScopeId::view_model()),
    )
    .binding(
      BindingDescriptor::new(Key::new("EntryArgs", None), ENTRY, "entry.rs:1")
        .scoped(ScopeId::navigation_entry()),
    )
    .require("ScreenState", "Analytics")
    .require("EntryArgs", "ScreenState")
    .require("EntryArgs", "Analytics")
    .build();

  let report = validate(&model);
  assert_eq!(kinds(&report), vec![]);
}

#[test]
fn deferred_access_is_exempt_from_visibility() {
  let model = StaticModel::builder()
    .binding(singleton("Analytics", "analytics.rs:1"))
    .bind("ScreenState", SCREEN, "screen.rs:1")
    .require("Analytics", "Provider<ScreenState>")
    .build();

  assert!(validate(&model).is_ok());
}

#[test]
fn long_lived_binding_holding_short_lived_one_is_a_lifetime_violation() {
  // The root component also allows view-model scoped bindings, so both are
  // visible from the root but live for different lengths of time.
  let mut tree = ComponentTree::builtin();
  tree.insert(Component::singleton().allow_scope(ScopeId::VIEW_MODEL));

  let model = StaticModel::builder()
    .with_components(tree)
    .binding(singleton("Cache", "cache.rs:1"))
    .binding(
      BindingDescriptor::new(Key::new("Session", None), ROOT, "session.rs:1").scoped(ScopeId::view_model()),
    )
    .require("Cache", "Session")
    .build();

  let report = validate(&model);
  assert_eq!(kinds(&report), vec![DiagnosticKind::ScopeLifetimeViolation]);
  let diagnostic = &report.entries[0].diagnostic;
  assert!(diagnostic.summary.contains("rank 2"));
  assert!(diagnostic.summary.contains("rank 1"));
  assert!(diagnostic.fix.as_deref().unwrap().contains("Lazy<Session>"));
}

#[test]
fn longevity_override_from_config_changes_the_verdict() {
  let mut tree = ComponentTree::builtin();
  tree.insert(Component::singleton().allow_scope(ScopeId::VIEW_MODEL));
  let model = StaticModel::builder()
    .with_components(tree)
    .binding(singleton("Cache", "cache.rs:1"))
    .binding(
      BindingDescriptor::new(Key::new("Session", None), ROOT, "session.rs:1").scoped(ScopeId::view_model()),
    )
    .require("Cache", "Session")
    .build();

  let config = fibre_di_validate::ValidatorConfig::from_yaml_str("longevity: { view_model: 2 }").unwrap();
  assert!(Validator::new(config).validate(&model).is_ok());
}

#[test]
fn sibling_branch_binding_is_invisible() {
  let mut tree = ComponentTree::builtin();
  tree.insert(Component::new("SettingsComponent", "settings").with_parent(ROOT));

  let model = StaticModel::builder()
    .with_components(tree)
    .bind("ScreenState", SCREEN, "screen.rs:1")
    .bind("SettingsStore", "SettingsComponent", "settings.rs:1")
    .require("ScreenState", "SettingsStore")
    .build();

  let report = validate(&model);
  assert_eq!(kinds(&report), vec![DiagnosticKind::InvisibleBinding]);
  assert!(report.entries[0]
    .diagnostic
    .detail
    .as_deref()
    .unwrap()
    .contains("SettingsComponent"));
}

// --- Missing bindings ---

#[test]
fn missing_binding_is_reported_once_naming_both_types() {
  let model = StaticModel::builder()
    .bind("Y", ROOT, "y.rs:1")
    .require("Y", "X")
    .require("Y", "X")
    .build();

  let report = validate(&model);
  assert_eq!(kinds(&report), vec![DiagnosticKind::MissingBinding]);
  let message = report.entries[0].diagnostic.message();
  assert!(message.starts_with("Missing binding for X\nDetail: Required by Y\nFix: "));
}

#[test]
fn deferred_requirement_still_needs_a_binding() {
  let model = StaticModel::builder()
    .bind("Y", ROOT, "y.rs:1")
    .require("Y", "Lazy<X>")
    .build();

  assert_eq!(kinds(&validate(&model)), vec![DiagnosticKind::MissingBinding]);
}

#[test]
fn exempt_types_need_no_binding() {
  let model = StaticModel::builder()
    .bind("Y", ROOT, "y.rs:1")
    .require("Y", "String")
    .require("Y", "u64")
    .build();

  assert!(validate(&model).is_ok());
}

#[test]
fn qualified_requirement_needs_a_qualified_binding() {
  let model = StaticModel::builder()
    .bind("Client", ROOT, "client.rs:1")
    .bind("Y", ROOT, "y.rs:1")
    .requirement(DependencyRequirement::new("Client", "Y").qualified("authenticated"))
    .build();

  let report = validate(&model);
  assert_eq!(kinds(&report), vec![DiagnosticKind::MissingBinding]);
  assert!(report.entries[0].diagnostic.summary.contains("authenticated"));
}

// --- Components ---

#[test]
fn duplicate_component_scope_names_every_component() {
  let model = StaticModel::builder()
    .component(Component::new("ScreenComponent", ScopeId::VIEW_MODEL).with_parent(ROOT))
    .build();

  let report = validate(&model);
  assert_eq!(kinds(&report), vec![DiagnosticKind::DuplicateComponentScope]);
  let detail = report.entries[0].diagnostic.detail.clone().unwrap();
  assert!(detail.contains("ScreenComponent"));
  assert!(detail.contains(SCREEN));
}

#[test]
fn unknown_component_is_reported_per_reference() {
  let model = StaticModel::builder()
    .bind("Repo", "DataComponent", "repo.rs:1")
    .component(Component::new("WorkerComponent", "worker").with_parent("NoSuchParent"))
    .build();

  let report = validate(&model);
  assert_eq!(
    kinds(&report),
    vec![DiagnosticKind::UnknownComponent, DiagnosticKind::UnknownComponent]
  );
}

#[test]
fn scope_not_allowed_in_component() {
  let model = StaticModel::builder()
    .binding(
      BindingDescriptor::new(Key::new("Session", None), ROOT, "session.rs:1").scoped(ScopeId::view_model()),
    )
    .build();

  assert_eq!(kinds(&validate(&model)), vec![DiagnosticKind::ScopeNotAllowed]);
}

// --- Reachability ---

#[test]
fn unreachable_binding_is_a_warning() {
  let model = StaticModel::builder()
    .bind("App", ROOT, "app.rs:1")
    .bind("Repo", ROOT, "repo.rs:1")
    .bind("Legacy", ROOT, "legacy.rs:1")
    .bind("ScreenState", SCREEN, "screen.rs:1")
    .require("App", "Repo")
    .require("ScreenState", "Lazy<App>")
    .entry_point(SCREEN, "ScreenState")
    .build();

  let report = validate(&model);
  assert!(report.is_ok());
  assert_eq!(kinds(&report), vec![DiagnosticKind::UnreachableBinding]);
  assert!(report.entries[0].diagnostic.summary.contains("Legacy"));
}

#[test]
fn no_entry_points_means_no_reachability_warnings() {
  let model = StaticModel::builder().bind("Legacy", ROOT, "legacy.rs:1").build();
  let report = validate(&model);
  assert_eq!(report.entries, vec![]);
}

// --- Declaration shapes ---

fn details(report: &ValidationReport, kind: DiagnosticKind) -> Vec<String> {
  report
    .of_kind(kind)
    .iter()
    .map(|e| e.diagnostic.detail.clone().unwrap_or_default())
    .collect()
}

fn binds_details(declaration: BindsDeclaration) -> Vec<String> {
  let model = StaticModel::builder().binds(declaration).build();
  details(&validate(&model), DiagnosticKind::InvalidBindsShape)
}

fn provides_details(declaration: ProvidesDeclaration) -> Vec<String> {
  let model = StaticModel::builder().provides(declaration).build();
  details(&validate(&model), DiagnosticKind::InvalidProvidesShape)
}

#[test]
fn well_formed_declarations_have_no_shape_problems() {
  let model = StaticModel::builder()
    .binds(BindsDeclaration::new("Repo", "SqlRepo", ROOT, "module.rs:3"))
    .provides(ProvidesDeclaration::new("Clock", ROOT, "module.rs:8"))
    .build();
  let report = validate(&model);

  assert!(report.of_kind(DiagnosticKind::InvalidBindsShape).is_empty());
  assert!(report.of_kind(DiagnosticKind::InvalidProvidesShape).is_empty());
}

#[test]
fn binds_with_two_parameters() {
  let mut binds = BindsDeclaration::new("Repo", "SqlRepo", ROOT, "module.rs:3");
  binds.parameter_count = 2;
  assert_eq!(
    binds_details(binds),
    vec!["The declaration takes 2 parameters instead of exactly one.".to_string()]
  );
}

#[test]
fn binds_with_a_body() {
  let mut binds = BindsDeclaration::new("Repo", "SqlRepo", ROOT, "module.rs:3");
  binds.is_abstract = false;
  assert_eq!(binds_details(binds), vec!["The declaration has a body.".to_string()]);
}

#[test]
fn binds_returning_another_type() {
  let mut binds = BindsDeclaration::new("Repo", "SqlRepo", ROOT, "module.rs:3");
  binds.return_type = Some("Cache".to_string());
  assert_eq!(
    binds_details(binds),
    vec!["The declaration returns Cache instead of Repo.".to_string()]
  );
}

#[test]
fn binds_to_itself() {
  let binds = BindsDeclaration::new("Repo", "Repo", ROOT, "module.rs:3");
  assert_eq!(binds_details(binds), vec!["The declaration binds a type to itself.".to_string()]);
}

#[test]
fn binds_problems_are_reported_together() {
  let mut binds = BindsDeclaration::new("Repo", "SqlRepo", ROOT, "module.rs:3");
  binds.parameter_count = 0;
  binds.return_type = None;
  assert_eq!(
    binds_details(binds),
    vec!["The declaration takes 0 parameters instead of exactly one, returns nothing.".to_string()]
  );
}

#[test]
fn provider_returning_nothing() {
  let mut provides = ProvidesDeclaration::new("Clock", ROOT, "module.rs:8");
  provides.returns_unit = true;
  assert_eq!(provides_details(provides), vec!["The function returns nothing.".to_string()]);
}

#[test]
fn abstract_provider() {
  let mut provides = ProvidesDeclaration::new("Clock", ROOT, "module.rs:8");
  provides.is_abstract = true;
  assert_eq!(provides_details(provides), vec!["The function has no body.".to_string()]);
}
