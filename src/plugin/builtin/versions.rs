//! Version Commands
//!
//! `version list`, `version current`, `version use <name>` and
//! `version show <name>` over the assistant's version manager, plus
//! `version manager [name]` to swap the manager implementation itself.

use crate::assistant::{Assistant, Capability, HandlerContext, StrategyRegistry};
use crate::output::format_compact_table;
use crate::plugin::error::PluginResult;
use crate::plugin::traits::{CommandHandler, Plugin};

/// Version commands; `strategies` supplies replacement version managers
#[derive(Default)]
pub struct VersionsPlugin {
    strategies: StrategyRegistry,
}

impl VersionsPlugin {
    pub fn new(strategies: StrategyRegistry) -> Self {
        Self { strategies }
    }
}

impl Plugin for VersionsPlugin {
    fn name(&self) -> &str {
        "versions"
    }

    fn description(&self) -> &str {
        "Lists and switches method versions"
    }

    fn register(&self, assistant: &mut Assistant) -> PluginResult<()> {
        assistant.add_handler(Box::new(VersionsHandler {
            strategies: self.strategies.clone(),
        }));
        Ok(())
    }
}

/// Phrasings that swap the version manager, matched on lowercased input
const MANAGER_ALIASES: [&str; 2] = ["use version manager", "dùng version manager"];

pub struct VersionsHandler {
    strategies: StrategyRegistry,
}

impl VersionsHandler {
    fn manager(&self, ctx: &mut HandlerContext<'_>, requested: Option<&str>) -> PluginResult<String> {
        let available = self.strategies.implementations(Capability::VersionManager);
        let current = ctx.version_manager_name();
        let Some(requested) = requested else {
            return Ok(format!(
                "Version manager: {} (available: {})",
                current,
                available.join(", ")
            ));
        };

        let Some(name) = available.iter().find(|name| name.eq_ignore_ascii_case(requested)) else {
            return Ok(format!(
                "Unknown version manager '{}'; still using '{}'",
                requested, current
            ));
        };
        if *name == current {
            return Ok(format!("Already using version manager '{}'", current));
        }
        let next = self.strategies.create_version_manager(name)?;
        ctx.request_version_manager(next);
        Ok(format!("Switched version manager from '{}' to '{}'", current, name))
    }

    fn list(ctx: &HandlerContext<'_>) -> String {
        let current = ctx.current_version().to_string();
        let rows: Vec<Vec<String>> = ctx
            .version_names()
            .into_iter()
            .filter_map(|name| ctx.version_summary(&name))
            .map(|summary| {
                vec![
                    if summary.name == current { "*".to_string() } else { String::new() },
                    summary.name,
                    summary.methods.len().to_string(),
                    summary.classes.len().to_string(),
                    summary.description,
                ]
            })
            .collect();
        format!(
            "Versions:\n{}",
            format_compact_table(&["", "Name", "Methods", "Classes", "Description"], &rows)
        )
    }

    fn show(ctx: &HandlerContext<'_>, name: &str) -> String {
        let Some(summary) = ctx.version_summary(name) else {
            return format!("Unknown version '{}'", name);
        };
        if summary.methods.is_empty() && summary.classes.is_empty() {
            return format!("Version '{}' has no bindings", name);
        }
        let mut rows: Vec<Vec<String>> = summary
            .methods
            .iter()
            .map(|m| {
                vec![
                    format!("{}.{}", m.entity, m.method),
                    m.callables.to_string(),
                    m.description.clone(),
                ]
            })
            .collect();
        rows.extend(summary.classes.iter().map(|entity| {
            let methods = ctx.class_methods(entity, Some(name)).unwrap_or_default();
            vec![format!("{} (class)", entity), "-".to_string(), methods.join(", ")]
        }));
        format!(
            "Version '{}':\n{}",
            name,
            format_compact_table(&["Binding", "Callables", "Description"], &rows)
        )
    }
}

impl CommandHandler for VersionsHandler {
    fn name(&self) -> &str {
        "versions"
    }

    fn can_handle(&self, input: &str) -> bool {
        input == "version"
            || input.starts_with("version ")
            || input == "versions"
            || MANAGER_ALIASES.iter().any(|alias| input.starts_with(alias))
    }

    fn handle(&mut self, input: &str, ctx: &mut HandlerContext<'_>) -> PluginResult<String> {
        if let Some(alias) = MANAGER_ALIASES.iter().find(|alias| input.starts_with(*alias)) {
            let name = input[alias.len()..].trim().to_string();
            return self.manager(ctx, (!name.is_empty()).then_some(name.as_str()));
        }

        // Version names keep their case
        let raw = ctx.raw_input().to_string();
        let args: Vec<&str> = raw.split_whitespace().skip(1).collect();
        let sub = args.first().map(|s| s.to_lowercase());

        let reply = match (sub.as_deref(), args.get(1)) {
            (Some("manager"), requested) => return self.manager(ctx, requested.copied()),
            (None, _) | (Some("list"), _) => Self::list(ctx),
            (Some("current"), _) => format!("Current version: {}", ctx.current_version()),
            (Some("use"), Some(name)) | (Some("switch"), Some(name)) => {
                if ctx.switch_version(name) {
                    format!("Switched to version '{}'", name)
                } else {
                    format!(
                        "Unknown version '{}'; still using '{}'",
                        name,
                        ctx.current_version()
                    )
                }
            }
            (Some("show"), Some(name)) => Self::show(ctx, name),
            (Some("show"), None) => {
                let current = ctx.current_version().to_string();
                Self::show(ctx, &current)
            }
            _ => format!("Unrecognised version command '{}'", input),
        };
        Ok(reply)
    }

    fn command_hints(&self) -> Vec<String> {
        vec![
            "version list".to_string(),
            "version current".to_string(),
            "version use <name>".to_string(),
            "version show [name]".to_string(),
            "version manager [name]".to_string(),
        ]
    }
}
