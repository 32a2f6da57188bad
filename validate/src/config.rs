//! Validator settings, read from YAML.

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs::File;
use std::io;
use std::iter;
use std::path::{Path, PathBuf};

const CONFIG_BASE_NAME: &str = "fibre_di";
const CONFIG_EXTENSION: &str = "yaml";

/// Tunables for a validation run.
///
/// ```yaml
/// exempt_types: ["Context"]
/// deferred_wrappers: ["Lazy", "Provider", "Deferred"]
/// report_unreachable: true
/// warnings_as_errors: false
/// disabled_passes: ["reachability"]
/// longevity:
///   activity: 1
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ValidatorConfig {
  /// Types that never need a binding and never become graph edges. Added to
  /// the built-in primitive list.
  #[serde(default)]
  pub exempt_types: Vec<String>,
  /// Generic wrappers whose argument is resolved lazily, e.g. `Lazy` for
  /// `Lazy<Foo>`.
  #[serde(default = "default_deferred_wrappers")]
  pub deferred_wrappers: Vec<String>,
  #[serde(default = "default_true")]
  pub report_unreachable: bool,
  /// Turns every warning into an error in the final report.
  #[serde(default)]
  pub warnings_as_errors: bool,
  /// Pass names to skip.
  #[serde(default)]
  pub disabled_passes: Vec<String>,
  /// Longevity rank per scope id, replacing the built-in ranks.
  #[serde(default)]
  pub longevity: BTreeMap<String, u8>,
}

fn default_deferred_wrappers() -> Vec<String> {
  vec!["Lazy".to_string(), "Provider".to_string(), "Deferred".to_string()]
}

fn default_true() -> bool {
  true
}

impl Default for ValidatorConfig {
  fn default() -> Self {
    Self {
      exempt_types: Vec::new(),
      deferred_wrappers: default_deferred_wrappers(),
      report_unreachable: true,
      warnings_as_errors: false,
      disabled_passes: Vec::new(),
      longevity: BTreeMap::new(),
    }
  }
}

/// Candidate config file names, most specific first.
fn config_file_names(environment_suffix: Option<&str>) -> Vec<String> {
  let environment = environment_suffix
    .map(str::to_owned)
    .or_else(|| env::var("FIBRE_ENV").ok())
    .or_else(|| env::var("APP_ENV").ok())
    .filter(|e| !e.is_empty());

  environment
    .map(|e| format!("{CONFIG_BASE_NAME}.{e}.{CONFIG_EXTENSION}"))
    .into_iter()
    .chain(iter::once(format!("{CONFIG_BASE_NAME}.{CONFIG_EXTENSION}")))
    .collect()
}

/// Primitive and standard types that are never bound.
const BUILTIN_EXEMPT: &[&str] = &[
  "bool", "char", "str", "&str", "String", "alloc::string::String", "i8", "i16", "i32", "i64",
  "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize", "f32", "f64", "()",
];

impl ValidatorConfig {
  pub fn from_yaml_str(yaml: &str) -> Result<Self> {
    serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
  }

  pub fn from_file(path: &Path) -> Result<Self> {
    tracing::debug!(path = %path.display(), "Loading validator config");
    let file = File::open(path)?;
    serde_yaml::from_reader(io::BufReader::new(file)).map_err(|e| ConfigError::Parse(e.to_string()))
  }

  /// Searches `dir` for `fibre_di.<env>.yaml`, then `fibre_di.yaml`.
  ///
  /// The environment is `environment_suffix` if given, else `FIBRE_ENV`, else
  /// `APP_ENV`.
  pub fn find_config_file(dir: &Path, environment_suffix: Option<&str>) -> Result<PathBuf> {
    let names = config_file_names(environment_suffix);
    names
      .iter()
      .map(|name| dir.join(name))
      .find(|path| path.is_file())
      .ok_or_else(|| ConfigError::NotFound(format!("none of {} in {}", names.join(", "), dir.display())))
  }

  /// Loads the config found by [`find_config_file`](Self::find_config_file),
  /// or the defaults if there is none.
  pub fn discover(dir: &Path, environment_suffix: Option<&str>) -> Result<Self> {
    match Self::find_config_file(dir, environment_suffix) {
      Ok(path) => Self::from_file(&path),
      Err(ConfigError::NotFound(_)) => Ok(Self::default()),
      Err(e) => Err(e),
    }
  }

  pub fn is_exempt(&self, type_name: &str) -> bool {
    BUILTIN_EXEMPT.contains(&type_name) || self.exempt_types.iter().any(|t| t == type_name)
  }

  /// Splits `Wrapper<Inner>` into `(Wrapper, Inner)` when `Wrapper` is a
  /// configured deferred wrapper. Path prefixes on the wrapper are ignored.
  pub fn deferred_wrapper<'a>(&self, type_name: &'a str) -> Option<(&'a str, &'a str)> {
    let open = type_name.find('<')?;
    let inner = type_name[open + 1..].strip_suffix('>')?;
    let wrapper = &type_name[..open];
    let short = wrapper.rsplit("::").next().unwrap_or(wrapper);
    self
      .deferred_wrappers
      .iter()
      .any(|w| w == short)
      .then_some((short, inner.trim()))
  }

  pub fn is_pass_enabled(&self, name: &str) -> bool {
    !self.disabled_passes.iter().any(|p| p == name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use std::fs;

  #[test]
  fn empty_yaml_gives_defaults() {
    let config = ValidatorConfig::from_yaml_str("{}").unwrap();
    assert_eq!(config, ValidatorConfig::default());
  }

  #[test]
  fn full_yaml_parses() {
    let config = ValidatorConfig::from_yaml_str(
      r#"
exempt_types: ["Context"]
deferred_wrappers: ["Lazy"]
report_unreachable: false
warnings_as_errors: true
disabled_passes: ["acyclic"]
longevity:
  activity: 1
"#,
    )
    .unwrap();

    assert_eq!(config.exempt_types, vec!["Context".to_string()]);
    assert_eq!(config.deferred_wrappers, vec!["Lazy".to_string()]);
    assert!(!config.report_unreachable);
    assert!(config.warnings_as_errors);
    assert!(!config.is_pass_enabled("acyclic"));
    assert!(config.is_pass_enabled("unique-bindings"));
    assert_eq!(config.longevity.get("activity"), Some(&1));
  }

  #[test]
  fn unknown_field_is_rejected() {
    let err = ValidatorConfig::from_yaml_str("report_everything: true").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
  }

  #[test]
  fn deferred_wrapper_detection() {
    let config = ValidatorConfig::default();
    assert_eq!(config.deferred_wrapper("Lazy<Foo>"), Some(("Lazy", "Foo")));
    assert_eq!(
      config.deferred_wrapper("fibre_di::Provider<app::Repo>"),
      Some(("Provider", "app::Repo"))
    );
    assert_eq!(config.deferred_wrapper("Vec<Foo>"), None);
    assert_eq!(config.deferred_wrapper("Foo"), None);
  }

  #[test]
  fn exempt_types_include_primitives() {
    let config = ValidatorConfig::from_yaml_str("exempt_types: [Context]").unwrap();
    assert!(config.is_exempt("u32"));
    assert!(config.is_exempt("Context"));
    assert!(!config.is_exempt("Repository"));
  }

  #[test]
  fn config_file_names_put_the_environment_first() {
    assert_eq!(config_file_names(Some("ci")), vec!["fibre_di.ci.yaml", "fibre_di.yaml"]);
    // An empty suffix names no environment.
    assert_eq!(config_file_names(Some("")), vec!["fibre_di.yaml"]);
  }

  #[test]
  fn find_config_file_prefers_environment() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("fibre_di.yaml"), "{}").unwrap();
    fs::write(dir.path().join("fibre_di.ci.yaml"), "warnings_as_errors: true").unwrap();

    let found = ValidatorConfig::find_config_file(dir.path(), Some("ci")).unwrap();
    assert_eq!(found, dir.path().join("fibre_di.ci.yaml"));
    assert!(ValidatorConfig::from_file(&found).unwrap().warnings_as_errors);

    let fallback = ValidatorConfig::find_config_file(dir.path(), Some("prod")).unwrap();
    assert_eq!(fallback, dir.path().join("fibre_di.yaml"));
  }

  #[test]
  fn missing_config_is_not_found_and_discover_defaults() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
      ValidatorConfig::find_config_file(dir.path(), Some("dev")),
      Err(ConfigError::NotFound(_))
    ));
    assert_eq!(
      ValidatorConfig::discover(dir.path(), Some("dev")).unwrap(),
      ValidatorConfig::default()
    );
  }
}
