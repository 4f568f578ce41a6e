//! Input Processing Strategies
//!
//! An input processor sits between a run mode and the assistant: it decides
//! whether a line ends the session or is dispatched.

use super::context::Prompter;
use super::{Assistant, Response};
use crate::plugin::error::PluginResult;

/// Default exit tokens
pub const DEFAULT_EXIT_TOKENS: &[&str] = &["exit", "quit", "thoát"];

/// Default farewell message
pub const DEFAULT_FAREWELL: &str = "Goodbye!";

/// Outcome of one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The line was dispatched; keep going
    Continue(Response),
    /// The line was an exit token; stop with this farewell
    Exit(String),
}

/// Settings shared by the built-in input processors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSettings {
    pub exit_tokens: Vec<String>,
    pub farewell: String,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            exit_tokens: DEFAULT_EXIT_TOKENS.iter().map(|s| s.to_string()).collect(),
            farewell: DEFAULT_FAREWELL.to_string(),
        }
    }
}

pub trait InputProcessor: Send {
    fn name(&self) -> &'static str;

    /// Whether `line` ends the session
    fn is_exit(&self, line: &str) -> bool;

    fn farewell(&self) -> &str;

    /// Exit on an exit token, otherwise dispatch to the assistant
    fn step(&self, assistant: &mut Assistant, line: &str, prompter: &mut dyn Prompter) -> PluginResult<Step> {
        if self.is_exit(line) {
            return Ok(Step::Exit(self.farewell().to_string()));
        }
        assistant.process_with(line, prompter).map(Step::Continue)
    }
}

/// Exit tokens matched case-insensitively after trimming
#[derive(Debug, Clone)]
pub struct StandardInput {
    tokens: Vec<String>,
    farewell: String,
}

impl StandardInput {
    pub fn new(settings: &InputSettings) -> Self {
        Self {
            tokens: settings.exit_tokens.iter().map(|t| t.trim().to_lowercase()).collect(),
            farewell: settings.farewell.clone(),
        }
    }
}

impl Default for StandardInput {
    fn default() -> Self {
        Self::new(&InputSettings::default())
    }
}

impl InputProcessor for StandardInput {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn is_exit(&self, line: &str) -> bool {
        let line = line.trim().to_lowercase();
        self.tokens.iter().any(|t| *t == line)
    }

    fn farewell(&self) -> &str {
        &self.farewell
    }
}

/// Exit tokens matched exactly, nothing stripped
#[derive(Debug, Clone)]
pub struct VerbatimInput {
    tokens: Vec<String>,
    farewell: String,
}

impl VerbatimInput {
    pub fn new(settings: &InputSettings) -> Self {
        Self {
            tokens: settings.exit_tokens.clone(),
            farewell: settings.farewell.clone(),
        }
    }
}

impl InputProcessor for VerbatimInput {
    fn name(&self) -> &'static str {
        "verbatim"
    }

    fn is_exit(&self, line: &str) -> bool {
        self.tokens.iter().any(|t| t == line)
    }

    fn farewell(&self) -> &str {
        &self.farewell
    }
}
