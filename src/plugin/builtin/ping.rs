//! Ping Plugin
//!
//! Liveness check: `ping` answers `Pong!` with a running count.

use crate::assistant::{Assistant, HandlerContext};
use crate::plugin::error::PluginResult;
use crate::plugin::traits::{CommandHandler, Plugin};

pub struct PingPlugin;

impl Plugin for PingPlugin {
    fn name(&self) -> &str {
        "ping"
    }

    fn description(&self) -> &str {
        "Answers ping with pong"
    }

    fn register(&self, assistant: &mut Assistant) -> PluginResult<()> {
        assistant.add_handler(Box::new(PingHandler::default()));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct PingHandler {
    count: u64,
}

impl CommandHandler for PingHandler {
    fn name(&self) -> &str {
        "ping"
    }

    fn can_handle(&self, input: &str) -> bool {
        input == "ping"
    }

    fn handle(&mut self, _input: &str, _ctx: &mut HandlerContext<'_>) -> PluginResult<String> {
        self.count += 1;
        Ok(format!("Pong! (#{})", self.count))
    }

    fn command_hints(&self) -> Vec<String> {
        vec!["ping".to_string()]
    }
}
