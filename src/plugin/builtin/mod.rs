//! Built-in Plugins
//!
//! Compiled-in plugins and the catalog that descriptor files link against.
//! `--init` writes one descriptor per built-in so a fresh plugin folder
//! starts with the full command set.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assistant::{Capability, StrategyDescriptor};
use crate::plugin::catalog::PluginCatalog;
use crate::plugin::descriptor::{ClassEntry, MethodEntry, PluginDescriptor};
use crate::plugin::discovery::write_descriptor_if_absent;
use crate::plugin::error::PluginResult;
use crate::version::{MergeMode, DEFAULT_VERSION};

pub mod calculator;
pub mod caller;
pub mod context;
pub mod help;
pub mod ping;
pub mod plugins;
pub mod today;
pub mod versions;

pub use calculator::CalculatorPlugin;
pub use caller::CallerPlugin;
pub use context::ContextPlugin;
pub use help::HelpPlugin;
pub use ping::PingPlugin;
pub use plugins::PluginsPlugin;
pub use today::TodayPlugin;
pub use versions::VersionsPlugin;

/// Version name used by the sample calculator descriptor for fan-out calls
pub const AUDIT_VERSION: &str = "audit";

/// Catalog holding every built-in entry point, function and class
pub fn default_catalog() -> PluginCatalog {
    let mut catalog = PluginCatalog::new();
    catalog
        .add_entry_point(Arc::new(PingPlugin))
        .add_entry_point(Arc::new(HelpPlugin))
        .add_entry_point(Arc::new(ContextPlugin))
        .add_entry_point(Arc::new(VersionsPlugin::default()))
        .add_entry_point(Arc::new(CallerPlugin))
        .add_entry_point(Arc::new(CalculatorPlugin))
        .add_entry_point(Arc::new(TodayPlugin))
        .add_entry_point(Arc::new(PluginsPlugin));
    calculator::register_catalog(&mut catalog);
    catalog
}

fn entry_point_descriptor(name: &str, description: &str) -> PluginDescriptor {
    let mut descriptor = PluginDescriptor::new(name);
    descriptor.entry_point = Some(name.to_string());
    descriptor.description = description.to_string();
    descriptor
}

fn calc_method(method: &str, version: &str, function: &str, mode: MergeMode) -> MethodEntry {
    MethodEntry {
        entity: calculator::ENTITY.to_string(),
        method: method.to_string(),
        version: version.to_string(),
        function: function.to_string(),
        description: String::new(),
        mode,
    }
}

/// One descriptor per built-in plugin
pub fn sample_descriptors() -> Vec<PluginDescriptor> {
    let mut calculator = entry_point_descriptor("calculator", "Arithmetic through the Calc entity");
    calculator.methods = vec![
        calc_method("add", DEFAULT_VERSION, "calc.add", MergeMode::Replace),
        calc_method("sub", DEFAULT_VERSION, "calc.sub", MergeMode::Replace),
        calc_method("mul", DEFAULT_VERSION, "calc.mul", MergeMode::Replace),
        calc_method("div", DEFAULT_VERSION, "calc.div", MergeMode::Replace),
        calc_method("add", AUDIT_VERSION, "calc.add", MergeMode::Replace),
        calc_method("add", AUDIT_VERSION, "calc.add_verbose", MergeMode::Multi),
    ];
    calculator.classes = vec![ClassEntry {
        entity: calculator::ENTITY.to_string(),
        version: DEFAULT_VERSION.to_string(),
        class: "calc.accumulator".to_string(),
    }];
    calculator.versions.insert(
        AUDIT_VERSION.to_string(),
        "Addition that also reports its operands".to_string(),
    );

    vec![
        calculator,
        entry_point_descriptor("caller", "Calls versioned methods and classes by name"),
        entry_point_descriptor("context", "Reads and writes the shared context"),
        entry_point_descriptor("help", "Lists available commands"),
        entry_point_descriptor("ping", "Answers ping with pong"),
        entry_point_descriptor("plugins", "Shows and toggles plugin descriptors"),
        entry_point_descriptor("today", "Tells today's date"),
        entry_point_descriptor("versions", "Lists and switches versions"),
    ]
}

fn strategy(capability: Capability, name: &str, description: &str) -> StrategyDescriptor {
    StrategyDescriptor {
        name: name.to_string(),
        capability,
        implementation: name.to_string(),
        enabled: true,
        preferred: false,
        description: description.to_string(),
        file_path: None,
    }
}

/// One descriptor per built-in strategy implementation
pub fn sample_strategies() -> Vec<StrategyDescriptor> {
    vec![
        strategy(Capability::Core, "standard", "First accepting handler answers"),
        strategy(Capability::Core, "fallthrough", "Failed handlers pass the input on"),
        strategy(Capability::VersionManager, "standard", "Version registry"),
        strategy(Capability::VersionManager, "traced", "Version registry with call logging"),
        strategy(Capability::InputProcessor, "standard", "Trimmed, case-insensitive exit tokens"),
        strategy(Capability::RunMode, "interactive", "Prompt loop on the terminal"),
        strategy(Capability::RunMode, "batch", "Commands from a script or stdin"),
    ]
}

/// Write the sample plugin descriptors into `plugin_dir`, keeping existing files
pub fn write_sample_descriptors(plugin_dir: &Path) -> PluginResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    for descriptor in sample_descriptors() {
        let path = plugin_dir.join(format!("{}.yaml", descriptor.name));
        if write_descriptor_if_absent(&path, &descriptor)? {
            written.push(path);
        }
    }
    Ok(written)
}

/// Write the sample strategy descriptors under `base_dir`, keeping existing files
pub fn write_sample_strategies(base_dir: &Path) -> PluginResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    for descriptor in sample_strategies() {
        let path = base_dir
            .join(descriptor.capability.folder())
            .join(format!("{}.yaml", descriptor.name));
        if write_descriptor_if_absent(&path, &descriptor)? {
            written.push(path);
        }
    }
    Ok(written)
}
