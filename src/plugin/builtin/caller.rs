//! Method Caller Plugin
//!
//! Exposes the inter-plugin call path on the command line:
//!
//! ```text
//! call Calc.add 2 3            current version
//! call Calc.add 2 3 @v2        one named version
//! call Calc.add 2 3 @v1,v2     several versions, results keyed by version
//! new Calc add 5              method on a fresh class instance
//! ```

use regex::Regex;
use serde_json::Value;

use super::context::parse_value;
use crate::assistant::{Assistant, HandlerContext};
use crate::output::format_value;
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::traits::{CommandHandler, Plugin};
use crate::version::VersionSelector;

pub struct CallerPlugin;

impl Plugin for CallerPlugin {
    fn name(&self) -> &str {
        "caller"
    }

    fn description(&self) -> &str {
        "Calls registered methods and classes by name"
    }

    fn register(&self, assistant: &mut Assistant) -> PluginResult<()> {
        assistant.add_handler(Box::new(CallerHandler::new()?));
        Ok(())
    }
}

/// Parser for `call` and `new` commands
#[derive(Debug, Clone)]
pub struct CallParser {
    command_pattern: Regex,
    token_pattern: Regex,
}

impl CallParser {
    pub fn new() -> PluginResult<Self> {
        let compile = |pattern: &str| Regex::new(pattern).map_err(|e| PluginError::generic(e.to_string()));
        Ok(Self {
            command_pattern: compile(r"(?i)^(call|new)\s+([\p{L}_][\p{L}\p{N}_]*)(?:\.([\p{L}_][\p{L}\p{N}_]*))?(.*)$")?,
            token_pattern: compile(r#""(?:[^"\\]|\\.)*"|\[[^\]]*\]|\{[^}]*\}|\S+"#)?,
        })
    }

    /// Parse the raw command text.
    ///
    /// `new` takes the method either as `Entity.method` or as the first
    /// argument (`new Entity method ...`).
    pub fn parse(&self, raw: &str) -> PluginResult<CallRequest> {
        let captures = self
            .command_pattern
            .captures(raw.trim())
            .ok_or_else(|| PluginError::invalid_arguments("usage: call <Entity>.<method> [args...] [@versions]"))?;

        let instantiate = captures[1].eq_ignore_ascii_case("new");
        let entity = captures[2].to_string();
        let mut tokens: Vec<&str> = self
            .token_pattern
            .find_iter(captures.get(4).map(|m| m.as_str()).unwrap_or(""))
            .map(|m| m.as_str())
            .collect();

        let selector = match tokens.last() {
            Some(last) if last.starts_with('@') => {
                let spec = last[1..].to_string();
                tokens.pop();
                VersionSelector::parse(Some(&spec))
            }
            _ => VersionSelector::Current,
        };

        let method = match captures.get(3) {
            Some(m) => m.as_str().to_string(),
            None if instantiate && !tokens.is_empty() => tokens.remove(0).to_string(),
            None => {
                return Err(PluginError::invalid_arguments(format!(
                    "missing method name after '{}'",
                    entity
                )))
            }
        };

        if instantiate && matches!(selector, VersionSelector::Many(_)) {
            return Err(PluginError::invalid_arguments("classes are resolved in one version at a time"));
        }

        Ok(CallRequest {
            instantiate,
            entity,
            method,
            args: tokens.into_iter().map(parse_value).collect(),
            selector,
        })
    }
}

/// A parsed `call` or `new` command
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    pub instantiate: bool,
    pub entity: String,
    pub method: String,
    pub args: Vec<Value>,
    pub selector: VersionSelector,
}

pub struct CallerHandler {
    parser: CallParser,
}

impl CallerHandler {
    pub fn new() -> PluginResult<Self> {
        Ok(Self { parser: CallParser::new()? })
    }
}

impl CommandHandler for CallerHandler {
    fn name(&self) -> &str {
        "caller"
    }

    fn can_handle(&self, input: &str) -> bool {
        input.starts_with("call ") || input.starts_with("new ")
    }

    fn handle(&mut self, _input: &str, ctx: &mut HandlerContext<'_>) -> PluginResult<String> {
        let request = self.parser.parse(ctx.raw_input())?;

        let outcome = if request.instantiate {
            let version = match &request.selector {
                VersionSelector::Named(name) => Some(name.as_str()),
                _ => None,
            };
            ctx.call_class_method(&request.entity, &request.method, &request.args, version)
        } else {
            ctx.call_method(&request.entity, &request.method, &request.args, &request.selector)
        };

        match outcome {
            Ok(value) => Ok(format_value(&value)),
            // A miss is an answer, not a failure
            Err(PluginError::NotFound { what }) => Ok(format!("Not found: {}", what)),
            Err(e) => Err(e),
        }
    }

    fn priority(&self) -> i32 {
        10
    }

    fn command_hints(&self) -> Vec<String> {
        vec![
            "call <Entity>.<method> [args...] [@v1,v2]".to_string(),
            "new <Entity> <method> [args...] [@version]".to_string(),
        ]
    }
}
