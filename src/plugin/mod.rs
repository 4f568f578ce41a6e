//! Plugin System Module
//!
//! Plugins are described by YAML descriptor files in a plugin folder. Each
//! descriptor names catalog entries (versioned methods, classes and a
//! registration entry point) that are linked and registered into a running
//! assistant.
//!
//! # Example Usage
//!
//! ```no_run
//! use vassist::assistant::Assistant;
//! use vassist::plugin::{builtin, FileBasedDiscovery, PluginDiscovery, PluginRegistrar};
//!
//! let mut assistant = Assistant::default();
//! let report = FileBasedDiscovery::new("plugins").discover(&builtin::default_catalog())?;
//! PluginRegistrar::register_all(&mut assistant, report.loaded);
//! # Ok::<(), vassist::plugin::PluginError>(())
//! ```

pub mod builtin;
pub mod catalog;
pub mod compatibility;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod priority_queue;
pub mod registrar;
pub mod traits;

#[cfg(test)]
pub mod tests;

pub use catalog::PluginCatalog;
pub use compatibility::VersionCompatibilityChecker;
pub use descriptor::{ClassEntry, LoadedPlugin, MethodEntry, PluginDescriptor};
pub use discovery::{
    list_descriptors, set_enabled, DescriptorState, DescriptorStatus, DiscoveryReport, FailedEntry,
    FileBasedDiscovery, PluginDescriptorParser, PluginDiscovery, SkippedEntry,
};
pub use error::{PluginError, PluginResult};
pub use registrar::{PluginRegistrar, RegistrationReport};
pub use traits::{CommandHandler, HandlerInfo, Plugin};
