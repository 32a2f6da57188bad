//! Public macros for ergonomic resolution from the process-wide root.

/// Resolves a binding from the root container of [`global()`](crate::global).
///
/// This macro panics if the process state is not initialized or the binding
/// cannot be resolved, so a missing dependency surfaces at the call site with
/// the full diagnostic. For a non-panicking version, call
/// `global().root()?.get::<T>()` directly.
///
/// # Panics
///
/// See above.
///
/// # Examples
///
/// ```
/// use fibre_di::{global, resolve, Registry, RegisterError};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync { fn greet(&self) -> String; }
/// struct EnglishGreeter;
/// impl Greeter for EnglishGreeter { fn greet(&self) -> String { "Hello!".to_string() } }
///
/// fn bindings(registry: &mut Registry) -> Result<(), RegisterError> {
///   registry.add_singleton(|_| Ok(String::from("hello")))?;
///   registry.add_singleton_trait::<dyn Greeter>(|_| Ok(Arc::new(EnglishGreeter)))
/// }
///
/// global().init(&[&bindings]).unwrap();
///
/// let message = resolve!(String);
/// assert_eq!(*message, "hello");
///
/// let greeter = resolve!(trait Greeter);
/// assert_eq!(greeter.greet(), "Hello!");
/// # global().reset();
/// ```
#[macro_export]
macro_rules! resolve {
    // Arm for resolving a trait object: resolve!(trait MyTrait)
    (trait $trait_ident:ident) => {
        $crate::__resolve_with!(dyn $trait_ident, |c: &$crate::Container| c.get::<dyn $trait_ident>())
    };

    // Arm for resolving a named trait object: resolve!(trait MyTrait, "name")
    (trait $trait_ident:ident, $name:expr) => {
        $crate::__resolve_with!(dyn $trait_ident, |c: &$crate::Container| c.get_named::<dyn $trait_ident>($name))
    };

    // Arm for resolving a concrete type: resolve!(MyService)
    ($type:ty) => {
        $crate::__resolve_with!($type, |c: &$crate::Container| c.get::<$type>())
    };

    // Arm for resolving a named concrete type: resolve!(MyService, "name")
    ($type:ty, $name:expr) => {
        $crate::__resolve_with!($type, |c: &$crate::Container| c.get_named::<$type>($name))
    };
}

/// Resolves the set multibinding of a type from the process-wide root.
///
/// # Panics
///
/// Panics like [`resolve!`].
#[macro_export]
macro_rules! resolve_set {
    (trait $trait_ident:ident) => {
        $crate::__resolve_with!(dyn $trait_ident, |c: &$crate::Container| c.get_set::<dyn $trait_ident>())
    };
    ($type:ty) => {
        $crate::__resolve_with!($type, |c: &$crate::Container| c.get_set::<$type>())
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __resolve_with {
    ($display:ty, $get:expr) => {{
        let root = $crate::global().root().unwrap_or_else(|e| {
            panic!(
                "Failed to resolve required service {}: {}",
                std::any::type_name::<$display>(),
                e
            )
        });
        let get = $get;
        get(&root).unwrap_or_else(|e| {
            panic!(
                "Failed to resolve required service {}: {}",
                std::any::type_name::<$display>(),
                e
            )
        })
    }};
}
