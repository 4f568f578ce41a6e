//! Plugin Registrar
//!
//! Feeds loaded plugins into a live assistant: methods first, then classes
//! and version descriptions, then the plugin's entry point. An entry point failure is contained to
//! its plugin.

use log::{debug, error, info, warn};

use crate::assistant::Assistant;
use crate::plugin::descriptor::LoadedPlugin;
use crate::plugin::error::{PluginError, PluginResult};

/// Outcome of registering a batch of plugins, in registration order
#[derive(Debug, Default)]
pub struct RegistrationReport {
    pub registered: Vec<String>,
    pub failed: Vec<(String, PluginError)>,
}

impl RegistrationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Stateless registration steps
pub struct PluginRegistrar;

impl PluginRegistrar {
    /// Register one plugin.
    ///
    /// Bindings are registered in declaration order. A failing entry point
    /// yields [`PluginError::RegistrationFailed`]; bindings registered
    /// before it stay in place.
    pub fn register(assistant: &mut Assistant, plugin: LoadedPlugin) -> PluginResult<()> {
        debug!(
            "Registering plugin '{}' ({} method(s), {} class(es))",
            plugin.name,
            plugin.methods.len(),
            plugin.classes.len()
        );

        for entry in plugin.methods {
            assistant
                .versions_mut()
                .register_method(
                    &entry.entity,
                    &entry.method,
                    &entry.version,
                    entry.callable,
                    &entry.description,
                    entry.mode,
                )
                .map_err(|e| PluginError::registration_failed(&plugin.name, e.to_string()))?;
        }

        for entry in plugin.classes {
            assistant
                .versions_mut()
                .register_class(&entry.entity, &entry.version, entry.factory)
                .map_err(|e| PluginError::registration_failed(&plugin.name, e.to_string()))?;
        }

        for (version, description) in &plugin.versions {
            if !assistant.versions_mut().describe_version(version, description) {
                warn!("Plugin '{}' describes unknown version '{}'", plugin.name, version);
            }
        }

        assistant.begin_plugin(plugin.priority);
        let outcome = match &plugin.entry_point {
            Some(entry_point) => entry_point.register(assistant),
            None => Ok(()),
        };
        assistant.end_plugin(&plugin.name, outcome.is_ok());

        outcome.map_err(|e| {
            let error = match e {
                PluginError::RegistrationFailed { .. } => e,
                other => PluginError::registration_failed(&plugin.name, other.to_string()),
            };
            error!("{}", error);
            error
        })
    }

    /// Register plugins in order; a failure never stops the rest
    pub fn register_all<I>(assistant: &mut Assistant, plugins: I) -> RegistrationReport
    where
        I: IntoIterator<Item = LoadedPlugin>,
    {
        let mut report = RegistrationReport::default();
        for plugin in plugins {
            let name = plugin.name.clone();
            match Self::register(assistant, plugin) {
                Ok(()) => report.registered.push(name),
                Err(e) => report.failed.push((name, e)),
            }
        }
        info!(
            "Registered {} plugin(s), {} failed",
            report.registered.len(),
            report.failed.len()
        );
        report
    }
}
