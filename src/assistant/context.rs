//! Handler Context
//!
//! The capability set a command handler receives while it runs: shared
//! context, inter-plugin calls, version switching and nested prompts.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::traits::HandlerInfo;
use crate::version::{VersionManager, VersionSelector, VersionSummary};

/// Key/value store shared by every plugin of one assistant
pub type SharedContext = BTreeMap<String, Value>;

/// Source of answers for prompts issued while a handler runs
pub trait Prompter {
    /// Ask a question and wait for one line of input.
    ///
    /// `None` means no answer is available (non-interactive run, end of
    /// input or interrupt).
    fn prompt(&mut self, question: &str) -> Option<String>;
}

/// Prompter for runs without an interactive user
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn prompt(&mut self, _question: &str) -> Option<String> {
        None
    }
}

/// Prompter answering from a fixed list, in order
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<String>,
    questions: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            questions: Vec::new(),
        }
    }

    /// Questions asked so far
    pub fn questions(&self) -> &[String] {
        &self.questions
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&mut self, question: &str) -> Option<String> {
        self.questions.push(question.to_string());
        self.answers.pop_front()
    }
}

/// Invoke a versioned method, turning a miss into [`PluginError::NotFound`]
pub fn call_method(
    versions: &dyn VersionManager,
    entity: &str,
    method: &str,
    args: &[Value],
    selector: &VersionSelector,
) -> PluginResult<Value> {
    versions.call(entity, method, selector, args)
}

/// Instantiate a class and call one of its methods on the fresh instance
pub fn call_class_method(
    versions: &dyn VersionManager,
    entity: &str,
    method: &str,
    args: &[Value],
    version: Option<&str>,
) -> PluginResult<Value> {
    let class = versions.resolve_class(entity, version).ok_or_else(|| {
        PluginError::not_found(format!(
            "class {} ({})",
            entity,
            version.unwrap_or(versions.current_version())
        ))
    })?;
    let mut instance = class.instantiate();
    instance.call(method, args)
}

/// What a handler can reach while handling one input
pub struct HandlerContext<'a> {
    raw_input: &'a str,
    versions: &'a mut dyn VersionManager,
    shared: &'a mut SharedContext,
    handlers: &'a [HandlerInfo],
    prompter: &'a mut dyn Prompter,
    plugin_dir: Option<&'a Path>,
    pending_versions: Option<Box<dyn VersionManager>>,
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        raw_input: &'a str,
        versions: &'a mut dyn VersionManager,
        shared: &'a mut SharedContext,
        handlers: &'a [HandlerInfo],
        prompter: &'a mut dyn Prompter,
        plugin_dir: Option<&'a Path>,
    ) -> Self {
        Self {
            raw_input,
            versions,
            shared,
            handlers,
            prompter,
            plugin_dir,
            pending_versions: None,
        }
    }

    /// The input as typed, before case folding
    pub fn raw_input(&self) -> &str {
        self.raw_input
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.shared.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.shared.insert(key.into(), value)
    }

    pub fn shared(&self) -> &SharedContext {
        &*self.shared
    }

    pub fn call_method(
        &self,
        entity: &str,
        method: &str,
        args: &[Value],
        selector: &VersionSelector,
    ) -> PluginResult<Value> {
        call_method(&*self.versions, entity, method, args, selector)
    }

    pub fn call_class_method(
        &self,
        entity: &str,
        method: &str,
        args: &[Value],
        version: Option<&str>,
    ) -> PluginResult<Value> {
        call_class_method(&*self.versions, entity, method, args, version)
    }

    pub fn switch_version(&mut self, name: &str) -> bool {
        self.versions.switch_version(name)
    }

    pub fn current_version(&self) -> &str {
        self.versions.current_version()
    }

    pub fn version_names(&self) -> Vec<String> {
        self.versions.version_names()
    }

    pub fn version_summary(&self, name: &str) -> Option<VersionSummary> {
        self.versions.version_summary(name)
    }

    /// Name of the version manager implementation in use
    pub fn version_manager_name(&self) -> &'static str {
        self.versions.implementation_name()
    }

    /// Ask the assistant to swap in `next` once this handler succeeds.
    ///
    /// The new manager takes over every registered version.
    pub fn request_version_manager(&mut self, next: Box<dyn VersionManager>) {
        self.pending_versions = Some(next);
    }

    pub(crate) fn take_version_manager_request(&mut self) -> Option<Box<dyn VersionManager>> {
        self.pending_versions.take()
    }

    /// Methods a class answers to, from a fresh instance
    pub fn class_methods(&self, entity: &str, version: Option<&str>) -> Option<Vec<&'static str>> {
        let class = self.versions.resolve_class(entity, version)?;
        Some(class.instantiate().methods())
    }

    /// Registered handlers in dispatch order
    pub fn handlers(&self) -> &[HandlerInfo] {
        self.handlers
    }

    /// Ask the user a follow-up question
    pub fn prompt(&mut self, question: &str) -> Option<String> {
        self.prompter.prompt(question)
    }

    /// Folder the plugin descriptors were discovered in
    pub fn plugin_dir(&self) -> Option<&Path> {
        self.plugin_dir
    }
}
