//! Versioned Method Registry
//!
//! Stores named versions of method and class bindings and resolves them at
//! call time, one version or several at once.
//!
//! ```no_run
//! use vassist::version::{method_fn, MergeMode, VersionManager, VersionRegistry, VersionSelector};
//! use serde_json::json;
//!
//! let mut registry = VersionRegistry::new();
//! registry.register_method("Calc", "add", "default",
//!     method_fn(|args| Ok(json!(args[0].as_i64().unwrap_or(0) + args[1].as_i64().unwrap_or(0)))),
//!     "Add two numbers", MergeMode::Replace)?;
//! let sum = registry.call("Calc", "add", &VersionSelector::Current, &[json!(2), json!(3)])?;
//! assert_eq!(sum, json!(5));
//! # Ok::<(), vassist::plugin::PluginError>(())
//! ```

pub mod binding;
pub mod manager;
pub mod registry;

pub use binding::{
    class_factory, method_fn, CallableRef, ClassFactory, MergeMode, MethodBinding, MethodFn, PluginObject,
};
pub use manager::{
    describe_selector, ResolvedClass, ResolvedMethod, TracedVersionManager, VersionManager, VersionSelector,
};
pub use registry::{MethodSummary, Version, VersionRegistry, VersionSummary, DEFAULT_VERSION};
