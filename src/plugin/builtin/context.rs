//! Shared Context Plugin
//!
//! `get context [key]` and `set context <key>=<value>` over the map every
//! plugin of the assistant shares. Values are parsed as JSON when they can
//! be, so `set context retries=3` stores a number.

use serde_json::Value;

use crate::assistant::{Assistant, HandlerContext};
use crate::output::{format_key_values, format_value};
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::traits::{CommandHandler, Plugin};

pub struct ContextPlugin;

impl Plugin for ContextPlugin {
    fn name(&self) -> &str {
        "context"
    }

    fn description(&self) -> &str {
        "Reads and writes the shared context"
    }

    fn register(&self, assistant: &mut Assistant) -> PluginResult<()> {
        assistant.add_handler(Box::new(ContextHandler));
        Ok(())
    }
}

/// JSON when it parses, a plain string otherwise
pub fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Text after a case-insensitive command prefix
fn after_prefix<'a>(raw: &'a str, prefix: &str) -> Option<&'a str> {
    let head = raw.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(raw[prefix.len()..].trim())
    } else {
        None
    }
}

pub struct ContextHandler;

impl CommandHandler for ContextHandler {
    fn name(&self) -> &str {
        "context"
    }

    fn can_handle(&self, input: &str) -> bool {
        input.starts_with("get context") || input.starts_with("set context")
    }

    fn handle(&mut self, input: &str, ctx: &mut HandlerContext<'_>) -> PluginResult<String> {
        let raw = ctx.raw_input().to_string();

        if input.starts_with("get context") {
            let key = after_prefix(&raw, "get context").unwrap_or("");
            if key.is_empty() {
                if ctx.shared().is_empty() {
                    return Ok("Context is empty".to_string());
                }
                return Ok(format!("Context:\n{}", format_key_values(ctx.shared())));
            }
            return Ok(match ctx.get(key) {
                Some(value) => format!("{} = {}", key, format_value(value)),
                None => format!("'{}' is not set", key),
            });
        }

        let assignment = after_prefix(&raw, "set context").unwrap_or("");
        let (key, value) = assignment
            .split_once('=')
            .map(|(k, v)| (k.trim(), v.trim()))
            .filter(|(k, _)| !k.is_empty())
            .ok_or_else(|| PluginError::invalid_arguments("usage: set context <key>=<value>"))?;

        let value = parse_value(value);
        let reply = format!("Set {} = {}", key, format_value(&value));
        ctx.set(key, value);
        Ok(reply)
    }

    fn command_hints(&self) -> Vec<String> {
        vec!["get context [key]".to_string(), "set context <key>=<value>".to_string()]
    }
}
