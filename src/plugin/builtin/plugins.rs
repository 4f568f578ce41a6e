//! Plugin Management Commands
//!
//! `plugin status` lists the descriptor files in the plugin folder;
//! `plugin enable <name>` and `plugin disable <name>` flip a descriptor's
//! `enabled` flag on disk. Changes apply at the next start.

use crate::assistant::{Assistant, HandlerContext};
use crate::output::format_compact_table;
use crate::plugin::discovery::{list_descriptors, set_enabled, DescriptorState};
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::traits::{CommandHandler, Plugin};

pub struct PluginsPlugin;

impl Plugin for PluginsPlugin {
    fn name(&self) -> &str {
        "plugins"
    }

    fn description(&self) -> &str {
        "Shows and toggles plugin descriptors"
    }

    fn register(&self, assistant: &mut Assistant) -> PluginResult<()> {
        assistant.add_handler(Box::new(PluginsHandler));
        Ok(())
    }
}

pub struct PluginsHandler;

impl PluginsHandler {
    fn status(ctx: &HandlerContext<'_>) -> PluginResult<String> {
        let folder = ctx
            .plugin_dir()
            .ok_or_else(|| PluginError::configuration_error("no plugin folder configured"))?;
        let statuses = list_descriptors(folder)?;
        if statuses.is_empty() {
            return Ok(format!("No plugin descriptors in {}", folder.display()));
        }

        let rows: Vec<Vec<String>> = statuses
            .into_iter()
            .map(|status| {
                let state = match status.state {
                    DescriptorState::Enabled => "enabled".to_string(),
                    DescriptorState::Disabled => "disabled".to_string(),
                    DescriptorState::Invalid(reason) => format!("invalid: {}", reason),
                };
                let file = status
                    .file
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default();
                vec![status.name, state, file, status.description]
            })
            .collect();
        Ok(format!(
            "Plugins in {}:\n{}",
            folder.display(),
            format_compact_table(&["Name", "State", "File", "Description"], &rows)
        ))
    }

    fn toggle(ctx: &HandlerContext<'_>, name: &str, enabled: bool) -> PluginResult<String> {
        let folder = ctx
            .plugin_dir()
            .ok_or_else(|| PluginError::configuration_error("no plugin folder configured"))?;
        match set_enabled(folder, name, enabled) {
            Ok(_) => Ok(format!(
                "Plugin '{}' {}; restart to apply",
                name,
                if enabled { "enabled" } else { "disabled" }
            )),
            Err(PluginError::NotFound { .. }) => Ok(format!("No plugin named '{}'", name)),
            Err(e) => Err(e),
        }
    }
}

impl CommandHandler for PluginsHandler {
    fn name(&self) -> &str {
        "plugins"
    }

    fn can_handle(&self, input: &str) -> bool {
        input == "plugin" || input == "plugins" || input.starts_with("plugin ")
    }

    fn handle(&mut self, _input: &str, ctx: &mut HandlerContext<'_>) -> PluginResult<String> {
        let raw = ctx.raw_input().to_string();
        let args: Vec<&str> = raw.split_whitespace().skip(1).collect();
        let sub = args.first().map(|s| s.to_lowercase());

        match (sub.as_deref(), args.get(1)) {
            (None, _) | (Some("status"), _) | (Some("list"), _) => Self::status(ctx),
            (Some("enable"), Some(name)) => Self::toggle(ctx, name, true),
            (Some("disable"), Some(name)) => Self::toggle(ctx, name, false),
            _ => Err(PluginError::invalid_arguments("usage: plugin status | plugin enable <name> | plugin disable <name>")),
        }
    }

    fn command_hints(&self) -> Vec<String> {
        vec![
            "plugin status".to_string(),
            "plugin enable <name>".to_string(),
            "plugin disable <name>".to_string(),
        ]
    }
}
