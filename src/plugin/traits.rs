//! Core Plugin Traits
//!
//! Defines what a plugin contributes to a running assistant: an optional
//! registration entry point and command handlers that it installs.

use crate::assistant::{Assistant, HandlerContext};
use crate::plugin::error::PluginResult;

/// Entry point of a compiled-in plugin
///
/// Descriptor files name an entry point by its catalog key. During
/// registration the entry point receives the live assistant and may add
/// handlers, seed the shared context, or register further bindings.
pub trait Plugin: Send + Sync {
    /// Catalog key of this entry point
    fn name(&self) -> &str;

    /// Install this plugin into the assistant
    fn register(&self, assistant: &mut Assistant) -> PluginResult<()>;

    /// Short human-readable description
    fn description(&self) -> &str {
        ""
    }
}

/// A command handler: a predicate over input text plus an action
///
/// Handlers are consulted in priority order (higher first, equal priorities
/// in insertion order). The first handler whose `can_handle` returns true
/// receives the input; no other handler is consulted.
pub trait CommandHandler: Send {
    /// Name shown in help listings and error messages
    fn name(&self) -> &str;

    /// Whether this handler accepts the (normalized) input
    fn can_handle(&self, input: &str) -> bool;

    /// Handle the input and produce a reply
    ///
    /// The call may block, including on nested prompts through
    /// [`HandlerContext::prompt`].
    fn handle(&mut self, input: &str, ctx: &mut HandlerContext<'_>) -> PluginResult<String>;

    /// Dispatch priority (higher runs first)
    fn priority(&self) -> i32 {
        0
    }

    /// Example commands for help output
    fn command_hints(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Snapshot of a registered handler, for listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInfo {
    pub name: String,
    pub priority: i32,
    pub hints: Vec<String>,
}
