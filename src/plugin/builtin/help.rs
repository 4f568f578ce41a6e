//! Help Plugin

use crate::assistant::{Assistant, HandlerContext};
use crate::plugin::error::PluginResult;
use crate::plugin::traits::{CommandHandler, Plugin};

const TRIGGERS: &[&str] = &["help", "trợ giúp", "lệnh", "?"];

pub struct HelpPlugin;

impl Plugin for HelpPlugin {
    fn name(&self) -> &str {
        "help"
    }

    fn description(&self) -> &str {
        "Lists the available commands"
    }

    fn register(&self, assistant: &mut Assistant) -> PluginResult<()> {
        assistant.add_handler(Box::new(HelpHandler));
        Ok(())
    }
}

pub struct HelpHandler;

impl CommandHandler for HelpHandler {
    fn name(&self) -> &str {
        "help"
    }

    fn can_handle(&self, input: &str) -> bool {
        TRIGGERS.contains(&input)
    }

    fn handle(&mut self, _input: &str, ctx: &mut HandlerContext<'_>) -> PluginResult<String> {
        let mut lines = vec!["Available commands:".to_string()];
        for info in ctx.handlers() {
            if info.hints.is_empty() {
                lines.push(format!("  [{}]", info.name));
            } else {
                lines.push(format!("  [{}] {}", info.name, info.hints.join(" | ")));
            }
        }
        lines.push(format!("Current version: {}", ctx.current_version()));
        Ok(lines.join("\n"))
    }

    fn command_hints(&self) -> Vec<String> {
        vec!["help".to_string(), "trợ giúp".to_string()]
    }
}
