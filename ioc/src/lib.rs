//! # Fibre DI
//!
//! A scoped, thread-safe dependency injection runtime for Rust.
//!
//! Bindings are registered once into a [`Registry`] and frozen into a shared
//! table. The resulting root [`Container`] resolves them, opening child scope
//! containers on demand. Every child sees the whole table but owns its own
//! cache, so lifetimes follow the scope hierarchy:
//!
//! - **Unscoped** bindings build a new value on every request.
//! - **Singleton** bindings are built once per root and shared by every scope.
//! - **Scoped** bindings are built once per open scope of the matching id and
//!   are invisible outside it.
//! - **Multibindings** aggregate independent contributions into one set or map.
//!
//! Static checks over the same model (cycles, lifetimes, missing or duplicate
//! bindings) live in the companion `fibre_di_validate` crate.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_di::{Registry, ScopeId};
//! use std::sync::Arc;
//!
//! struct Config {
//!   url: String,
//! }
//!
//! struct Session {
//!   config: Arc<Config>,
//! }
//!
//! let mut registry = Registry::new();
//! registry.add_instance(Config { url: "postgres://localhost".into() }).unwrap();
//! registry
//!   .add_scoped(ScopeId::VIEW_MODEL, |c| Ok(Session { config: c.get::<Config>()? }))
//!   .unwrap();
//! let root = registry.build();
//!
//! // Scoped bindings need their scope to be open.
//! assert!(root.get::<Session>().is_err());
//!
//! let screen = root.create_scope_container(ScopeId::VIEW_MODEL).unwrap();
//! let a = screen.get::<Session>().unwrap();
//! let b = screen.get::<Session>().unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! assert_eq!(a.config.url, "postgres://localhost");
//!
//! screen.dispose();
//! ```

mod binding;
mod container;
mod error;
mod global;
pub mod hierarchy;
mod key;
mod macros;
mod registry;
mod slot;
mod wrappers;

pub use crate::binding::{Binding, Factory, MapAssembler, SetAssembler};
pub use crate::container::{Container, ScopeGuard};
pub use crate::error::{RegisterError, ResolveError, Result, StateError};
pub use crate::global::{global, ProcessState};
pub use crate::hierarchy::{Component, ComponentTree, ScopeId};
pub use crate::key::{Instance, Key};
pub use crate::registry::{Contributor, Registry};
pub use crate::wrappers::{Deferred, Provider};
