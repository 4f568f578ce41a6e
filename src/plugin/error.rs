//! Plugin Error Types
//!
//! Error handling for plugin loading, registration, versioned resolution and
//! command dispatch.

use thiserror::Error;

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;

/// Error types for plugin operations
#[derive(Error, Debug, Clone)]
pub enum PluginError {
    /// A plugin file could not be read, parsed or linked
    #[error("Failed to load plugin {file}: {message}")]
    LoadFailed { file: String, message: String },

    /// A plugin's register entry point failed
    #[error("Plugin '{plugin}' failed to register: {message}")]
    RegistrationFailed { plugin: String, message: String },

    /// Unknown merge mode requested for a method registration
    #[error("Invalid merge mode '{mode}' (expected replace, append or multi)")]
    InvalidMergeMode { mode: String },

    /// An accepted command handler failed while handling input
    #[error("Handler '{handler}' failed: {message}")]
    HandlerFailed { handler: String, message: String },

    /// A registered method or class failed while executing
    #[error("Plugin execution error: {message}")]
    ExecutionFailed { message: String },

    /// Requested entity, method, class or version does not exist
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// Version compatibility error
    #[error("Version compatibility error: {message}")]
    VersionIncompatible { message: String },

    /// Configuration error
    #[error("Plugin configuration error: {message}")]
    ConfigurationError { message: String },

    /// Plugin discovery error
    #[error("Discovery error: {message}")]
    DiscoveryError { message: String },

    /// Plugin descriptor parsing error
    #[error("Descriptor parse error: {message}")]
    DescriptorParseError { message: String },

    /// Strategy selection or construction error
    #[error("Strategy error: {message}")]
    StrategyError { message: String },

    /// Invalid arguments passed to a method or class
    #[error("Invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Generic plugin error
    #[error("Plugin error: {message}")]
    Generic { message: String },
}

impl PluginError {
    /// Create a load failure for a plugin file
    pub fn load_failed<F: Into<String>, S: Into<String>>(file: F, message: S) -> Self {
        Self::LoadFailed { file: file.into(), message: message.into() }
    }

    /// Create a registration failure for a named plugin
    pub fn registration_failed<P: Into<String>, S: Into<String>>(plugin: P, message: S) -> Self {
        Self::RegistrationFailed { plugin: plugin.into(), message: message.into() }
    }

    /// Create an invalid merge mode error
    pub fn invalid_merge_mode<S: Into<String>>(mode: S) -> Self {
        Self::InvalidMergeMode { mode: mode.into() }
    }

    /// Create a handler failure
    pub fn handler_failed<H: Into<String>, S: Into<String>>(handler: H, message: S) -> Self {
        Self::HandlerFailed { handler: handler.into(), message: message.into() }
    }

    /// Create an execution error
    pub fn execution_failed<S: Into<String>>(message: S) -> Self {
        Self::ExecutionFailed { message: message.into() }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a version incompatible error
    pub fn version_incompatible<S: Into<String>>(message: S) -> Self {
        Self::VersionIncompatible { message: message.into() }
    }

    /// Create a configuration error
    pub fn configuration_error<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError { message: message.into() }
    }

    /// Create a discovery error
    pub fn discovery_error<S: Into<String>>(message: S) -> Self {
        Self::DiscoveryError { message: message.into() }
    }

    /// Create a descriptor parse error
    pub fn descriptor_parse_error<S: Into<String>>(message: S) -> Self {
        Self::DescriptorParseError { message: message.into() }
    }

    /// Create a strategy error
    pub fn strategy_error<S: Into<String>>(message: S) -> Self {
        Self::StrategyError { message: message.into() }
    }

    /// Create an invalid arguments error
    pub fn invalid_arguments<S: Into<String>>(message: S) -> Self {
        Self::InvalidArguments { message: message.into() }
    }

    /// Create a generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic { message: message.into() }
    }

    /// Check if error is recoverable (a fall-through core tries the next
    /// handler)
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PluginError::InvalidMergeMode { .. })
    }
}

// Allow conversion from common error types
impl From<std::io::Error> for PluginError {
    fn from(err: std::io::Error) -> Self {
        PluginError::generic(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for PluginError {
    fn from(err: serde_json::Error) -> Self {
        PluginError::invalid_arguments(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for PluginError {
    fn from(err: serde_yaml::Error) -> Self {
        PluginError::descriptor_parse_error(format!("YAML error: {}", err))
    }
}
