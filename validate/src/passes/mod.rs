//! The built-in passes.

pub mod model;
pub mod structural;

/// The usual advice for a dependency that must not be constructed eagerly.
pub(crate) fn deferred_fix(required: &str) -> String {
  format!(
    "Request it through a deferred accessor such as Lazy<{required}> or Provider<{required}> so it is resolved when first used"
  )
}
