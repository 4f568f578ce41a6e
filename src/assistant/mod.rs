//! Assistant Core
//!
//! The dispatcher: owns the version manager, the handler chain and the
//! shared context, and turns one line of text into one [`Response`].

pub mod bootstrap;
pub mod context;
pub mod handlers;
pub mod input;
pub mod run_mode;

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde_json::Value;

use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::traits::{CommandHandler, HandlerInfo};
use crate::version::{VersionManager, VersionRegistry, VersionSelector};

pub use bootstrap::{
    bootstrap, Bootstrap, BootstrapOptions, Capability, SelectionSource, StrategyChoice, StrategyDescriptor,
    StrategyRegistry,
};
pub use context::{HandlerContext, NoPrompt, Prompter, ScriptedPrompter, SharedContext};
pub use handlers::HandlerChain;
pub use input::{InputProcessor, InputSettings, StandardInput, Step, VerbatimInput};
pub use run_mode::{BatchMode, ExitReason, InteractiveMode, RunMode, RunSettings, RunSummary};

/// Reply given when no handler accepts the input
pub const DEFAULT_UNKNOWN_REPLY: &str = "Sorry, I don't understand that command.";

/// How input text is normalized before dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizationPolicy {
    pub trim: bool,
    pub case_sensitive: bool,
}

impl Default for NormalizationPolicy {
    fn default() -> Self {
        Self {
            trim: true,
            case_sensitive: false,
        }
    }
}

impl NormalizationPolicy {
    pub fn apply(&self, text: &str) -> String {
        let text = if self.trim { text.trim() } else { text };
        if self.case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        }
    }
}

/// Result of processing one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A handler accepted the input
    Handled { handler: String, text: String },
    /// No handler accepted the input
    Unknown(String),
}

impl Response {
    pub fn text(&self) -> &str {
        match self {
            Response::Handled { text, .. } => text,
            Response::Unknown(text) => text,
        }
    }

    pub fn handler(&self) -> Option<&str> {
        match self {
            Response::Handled { handler, .. } => Some(handler),
            Response::Unknown(_) => None,
        }
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, Response::Handled { .. })
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// How accepting handlers share an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchPolicy {
    /// The first accepting handler answers, success or failure
    #[default]
    FirstMatch,
    /// A handler failing with a recoverable error passes the input on to
    /// the next accepting handler
    FallThrough,
}

pub struct Assistant {
    versions: Box<dyn VersionManager>,
    handlers: HandlerChain,
    dispatch: DispatchPolicy,
    shared: SharedContext,
    normalization: NormalizationPolicy,
    unknown_reply: String,
    plugin_dir: Option<PathBuf>,
    registered_plugins: Vec<String>,
    priority_override: Option<i32>,
}

impl Assistant {
    pub fn new(versions: Box<dyn VersionManager>) -> Self {
        Self {
            versions,
            handlers: HandlerChain::new(),
            dispatch: DispatchPolicy::default(),
            shared: SharedContext::new(),
            normalization: NormalizationPolicy::default(),
            unknown_reply: DEFAULT_UNKNOWN_REPLY.to_string(),
            plugin_dir: None,
            registered_plugins: Vec::new(),
            priority_override: None,
        }
    }

    pub fn with_normalization(mut self, normalization: NormalizationPolicy) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn with_dispatch_policy(mut self, dispatch: DispatchPolicy) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn dispatch_policy(&self) -> DispatchPolicy {
        self.dispatch
    }

    pub fn with_unknown_reply(mut self, reply: impl Into<String>) -> Self {
        self.unknown_reply = reply.into();
        self
    }

    pub fn with_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugin_dir = Some(dir.into());
        self
    }

    pub fn versions(&self) -> &dyn VersionManager {
        self.versions.as_ref()
    }

    pub fn versions_mut(&mut self) -> &mut dyn VersionManager {
        self.versions.as_mut()
    }

    /// Swap in another version manager implementation, carrying every
    /// version and the current version over. Returns the name of the
    /// implementation that was replaced.
    pub fn replace_version_manager(&mut self, next: Box<dyn VersionManager>) -> &'static str {
        hand_over_versions(&mut self.versions, next)
    }

    pub fn normalization(&self) -> NormalizationPolicy {
        self.normalization
    }

    pub fn plugin_dir(&self) -> Option<&Path> {
        self.plugin_dir.as_deref()
    }

    /// Add a handler at its own priority.
    ///
    /// While a plugin with a descriptor priority is registering, that
    /// priority is used instead. Returns the handler's position.
    pub fn add_handler(&mut self, handler: Box<dyn CommandHandler>) -> usize {
        let priority = self.priority_override.unwrap_or_else(|| handler.priority());
        self.add_handler_with_priority(handler, priority)
    }

    pub fn add_handler_with_priority(&mut self, handler: Box<dyn CommandHandler>, priority: i32) -> usize {
        debug!("Adding handler '{}' with priority {}", handler.name(), priority);
        self.handlers.add(handler, priority)
    }

    /// Insert a handler at a fixed position in the chain
    pub fn insert_handler(&mut self, index: usize, handler: Box<dyn CommandHandler>) -> usize {
        debug!("Inserting handler '{}' at position {}", handler.name(), index);
        self.handlers.insert(index, handler)
    }

    pub fn remove_handler(&mut self, name: &str) -> bool {
        self.handlers.remove(name)
    }

    pub fn handlers(&self) -> Vec<HandlerInfo> {
        self.handlers.infos()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn context(&self) -> &SharedContext {
        &self.shared
    }

    pub fn context_mut(&mut self) -> &mut SharedContext {
        &mut self.shared
    }

    /// Plugins registered so far, in registration order
    pub fn registered_plugins(&self) -> &[String] {
        &self.registered_plugins
    }

    pub(crate) fn begin_plugin(&mut self, priority: Option<i32>) {
        self.priority_override = priority;
    }

    /// Close a registration window, recording the plugin when it succeeded
    pub(crate) fn end_plugin(&mut self, name: &str, registered: bool) {
        self.priority_override = None;
        if registered {
            self.registered_plugins.push(name.to_string());
        }
    }

    /// Call a registered method, the inter-plugin call path
    pub fn call_method(
        &self,
        entity: &str,
        method: &str,
        args: &[Value],
        selector: &VersionSelector,
    ) -> PluginResult<Value> {
        context::call_method(self.versions.as_ref(), entity, method, args, selector)
    }

    /// Call a method on a fresh instance of a registered class
    pub fn call_class_method(
        &self,
        entity: &str,
        method: &str,
        args: &[Value],
        version: Option<&str>,
    ) -> PluginResult<Value> {
        context::call_class_method(self.versions.as_ref(), entity, method, args, version)
    }

    /// Process one line without an interactive user
    pub fn process(&mut self, text: &str) -> PluginResult<Response> {
        self.process_with(text, &mut NoPrompt)
    }

    /// Process one line; the accepting handler may prompt through `prompter`
    pub fn process_with(&mut self, text: &str, prompter: &mut dyn Prompter) -> PluginResult<Response> {
        let input = self.normalization.apply(text);
        let raw = if self.normalization.trim { text.trim() } else { text };

        let candidates: Vec<usize> = match self.dispatch {
            DispatchPolicy::FirstMatch => self.handlers.find(&input).into_iter().collect(),
            DispatchPolicy::FallThrough => self.handlers.find_all(&input),
        };
        if candidates.is_empty() {
            debug!("No handler for '{}'", input);
            return Ok(Response::Unknown(self.unknown_reply.clone()));
        }

        let infos = self.handlers.infos();
        let mut first_error = None;
        for index in candidates {
            let (name, outcome) = self.run_handler(index, &input, raw, &infos, &mut *prompter)?;
            let error = match outcome {
                Ok(text) => return Ok(Response::Handled { handler: name, text }),
                Err(e) => e,
            };

            let fall_through = self.dispatch == DispatchPolicy::FallThrough && error.is_recoverable();
            let error = match error {
                e @ PluginError::HandlerFailed { .. } => e,
                e => PluginError::handler_failed(name, e.to_string()),
            };
            if !fall_through {
                return Err(error);
            }
            warn!("{}; passing the input on", error);
            first_error.get_or_insert(error);
        }

        Err(first_error.unwrap_or_else(|| PluginError::generic(format!("no handler completed '{}'", input))))
    }

    /// Run one handler; returns its name and its own outcome
    fn run_handler(
        &mut self,
        index: usize,
        input: &str,
        raw: &str,
        infos: &[HandlerInfo],
        prompter: &mut dyn Prompter,
    ) -> PluginResult<(String, PluginResult<String>)> {
        let Assistant {
            versions,
            handlers,
            shared,
            plugin_dir,
            ..
        } = self;

        let handler = handlers
            .get_mut(index)
            .ok_or_else(|| PluginError::generic(format!("handler index {} out of range", index)))?;
        let name = handler.name().to_string();
        debug!("Dispatching '{}' to handler '{}'", input, name);

        let mut ctx = HandlerContext::new(raw, versions.as_mut(), shared, infos, prompter, plugin_dir.as_deref());
        let outcome = handler.handle(input, &mut ctx);
        let replacement = ctx.take_version_manager_request();

        if let (Ok(_), Some(next)) = (&outcome, replacement) {
            hand_over_versions(versions, next);
        }
        Ok((name, outcome))
    }
}

fn hand_over_versions(slot: &mut Box<dyn VersionManager>, mut next: Box<dyn VersionManager>) -> &'static str {
    next.adopt_registry(slot.take_registry());
    let previous = std::mem::replace(slot, next);
    info!(
        "Version manager '{}' replaced by '{}'",
        previous.implementation_name(),
        slot.implementation_name()
    );
    previous.implementation_name()
}

impl Default for Assistant {
    fn default() -> Self {
        Self::new(Box::new(VersionRegistry::new()))
    }
}

impl fmt::Debug for Assistant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assistant")
            .field("versions", &self.versions.implementation_name())
            .field("current_version", &self.versions.current_version())
            .field("handlers", &self.handlers)
            .field("dispatch", &self.dispatch)
            .field("normalization", &self.normalization)
            .field("plugins", &self.registered_plugins)
            .finish()
    }
}
