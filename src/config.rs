use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use anyhow::{Context, Result};
use toml::Value;
use log::{debug, info};

use crate::assistant::input::{DEFAULT_EXIT_TOKENS, DEFAULT_FAREWELL};
use crate::assistant::run_mode::{DEFAULT_GREETING, DEFAULT_PROMPT};
use crate::assistant::DEFAULT_UNKNOWN_REPLY;

/// Configuration storage - section_name -> key -> value
pub type Configuration = HashMap<String, HashMap<String, String>>;

/// Section holding assistant settings
pub const ASSISTANT_SECTION: &str = "assistant";

/// Plugin folder name under the base directory
pub const DEFAULT_PLUGIN_FOLDER: &str = "plugins";

/// Configuration manager
pub struct ConfigManager {
    config: Configuration,
    config_file_path: Option<PathBuf>,
    selected_section: Option<String>,
}

/// Assistant settings after merging the config file over defaults
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    /// Root for the plugin and strategy folders
    pub base_dir: PathBuf,
    /// Plugin folder, relative paths resolved against `base_dir`
    pub plugin_dir: PathBuf,
    pub case_sensitive: bool,
    pub trim: bool,
    pub exit_tokens: Vec<String>,
    pub prompt: String,
    pub greeting: String,
    pub farewell: String,
    pub unknown_reply: String,
    pub run_mode: Option<String>,
    pub core: Option<String>,
    pub version_manager: Option<String>,
    pub input_processor: Option<String>,
    /// Version made current after plugins are registered
    pub initial_version: Option<String>,
    pub color: bool,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            plugin_dir: PathBuf::from(DEFAULT_PLUGIN_FOLDER),
            case_sensitive: false,
            trim: true,
            exit_tokens: DEFAULT_EXIT_TOKENS.iter().map(|s| s.to_string()).collect(),
            prompt: DEFAULT_PROMPT.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            farewell: DEFAULT_FAREWELL.to_string(),
            unknown_reply: DEFAULT_UNKNOWN_REPLY.to_string(),
            run_mode: None,
            core: None,
            version_manager: None,
            input_processor: None,
            initial_version: None,
            color: true,
        }
    }
}

impl AssistantConfig {
    /// Plugin folder with relative paths anchored at the base directory
    pub fn resolved_plugin_dir(&self) -> PathBuf {
        if self.plugin_dir.is_absolute() {
            self.plugin_dir.clone()
        } else {
            self.base_dir.join(&self.plugin_dir)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.exit_tokens.iter().all(|t| t.trim().is_empty()) {
            return Err(anyhow::anyhow!("exit-tokens must contain at least one non-empty token"));
        }
        if self.unknown_reply.is_empty() {
            return Err(anyhow::anyhow!("unknown-reply must not be empty"));
        }
        Ok(())
    }
}

impl ConfigManager {
    /// Create a new ConfigManager from a Configuration (primarily for testing)
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config,
            config_file_path: None,
            selected_section: None,
        }
    }

    /// Load configuration using discovery hierarchy
    pub fn load() -> Result<Self> {
        debug!("Starting configuration discovery");

        for path in discover_config_files() {
            debug!("Attempting to load config from: {}", path.display());
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        info!("No configuration file found, using empty configuration");
        Ok(Self::from_config(Configuration::new()))
    }

    /// Load configuration from explicit file path
    pub fn load_from_file(path: PathBuf) -> Result<Self> {
        debug!("Loading configuration from file: {}", path.display());

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = parse_toml_config(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Loaded configuration from: {}", path.display());
        Ok(Self {
            config,
            config_file_path: Some(path),
            selected_section: None,
        })
    }

    pub fn config_file_path(&self) -> Option<&PathBuf> {
        self.config_file_path.as_ref()
    }

    /// Get value from configuration with section fallback
    pub fn get_value(&self, section: &str, key: &str) -> Option<&String> {
        // Priority: selected_section -> specified section -> base
        if let Some(selected) = &self.selected_section {
            if let Some(value) = self.config.get(selected).and_then(|s| s.get(key)) {
                return Some(value);
            }
        }

        if let Some(value) = self.config.get(section).and_then(|s| s.get(key)) {
            return Some(value);
        }

        self.config.get("base").and_then(|s| s.get(key))
    }

    /// Select configuration section for --config-name
    pub fn select_section(&mut self, section: String) {
        debug!("Selecting configuration section: {}", section);
        self.selected_section = Some(section);
    }

    /// Get boolean value with type conversion
    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        match self.get_value(section, key) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(anyhow::anyhow!("Invalid boolean value for {}.{}: {}", section, key, value)),
            },
            None => Ok(None),
        }
    }

    /// Get log level value with type conversion
    pub fn get_log_level(&self, section: &str, key: &str) -> Result<Option<log::LevelFilter>> {
        match self.get_value(section, key) {
            Some(value) => Ok(Some(crate::logging::parse_log_level(value)?)),
            None => Ok(None),
        }
    }

    /// Get path value with type conversion
    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_value(section, key).map(PathBuf::from)
    }

    /// Get a list from a TOML array or a comma-separated string
    pub fn get_list(&self, section: &str, key: &str) -> Result<Option<Vec<String>>> {
        let Some(value) = self.get_value(section, key) else {
            return Ok(None);
        };

        let items = if value.trim_start().starts_with('[') {
            let table: toml::Table = format!("list = {}", value)
                .parse()
                .with_context(|| format!("Invalid list for {}.{}: {}", section, key, value))?;
            match table.get("list") {
                Some(Value::Array(array)) => array.iter().map(toml_value_to_string).collect(),
                _ => Vec::new(),
            }
        } else {
            value.split(',').map(|s| s.trim().to_string()).collect()
        };

        Ok(Some(items.into_iter().filter(|s: &String| !s.is_empty()).collect()))
    }

    /// Assistant settings from the `[assistant]` section over defaults
    pub fn get_assistant_config(&self) -> Result<AssistantConfig> {
        let section = ASSISTANT_SECTION;
        let mut config = AssistantConfig::default();

        if let Some(path) = self.get_path(section, "base-dir") {
            config.base_dir = path;
        }
        if let Some(path) = self.get_path(section, "plugin-dir") {
            config.plugin_dir = path;
        }
        if let Some(case_sensitive) = self.get_bool(section, "case-sensitive")? {
            config.case_sensitive = case_sensitive;
        }
        if let Some(trim) = self.get_bool(section, "trim")? {
            config.trim = trim;
        }
        if let Some(tokens) = self.get_list(section, "exit-tokens")? {
            config.exit_tokens = tokens;
        }
        if let Some(color) = self.get_bool(section, "color")? {
            config.color = color;
        }

        let text = |key: &str| self.get_value(section, key).cloned();
        if let Some(prompt) = text("prompt") {
            config.prompt = prompt;
        }
        if let Some(greeting) = text("greeting") {
            config.greeting = greeting;
        }
        if let Some(farewell) = text("farewell") {
            config.farewell = farewell;
        }
        if let Some(reply) = text("unknown-reply") {
            config.unknown_reply = reply;
        }
        config.run_mode = text("run-mode");
        config.core = text("core");
        config.version_manager = text("version-manager");
        config.input_processor = text("input-processor");
        config.initial_version = text("initial-version");

        config.validate()
            .with_context(|| "Assistant configuration validation failed")?;

        Ok(config)
    }
}

/// Discover configuration files in order of precedence
fn discover_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Environment variable $VASSIST_CONFIG
    if let Ok(env_path) = env::var("VASSIST_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    // 2. XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("vassist").join("config.toml"));
    }

    // 3. Home directory
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".vassist.toml"));
    }

    // 4. Project local
    paths.push(PathBuf::from("./.vassist.toml"));

    debug!("Config discovery paths: {:?}", paths);
    paths
}

/// Parse TOML content to string-based configuration
fn parse_toml_config(content: &str) -> Result<Configuration> {
    let toml_value: Value = content.parse()
        .context("Failed to parse TOML content")?;

    let mut config = Configuration::new();

    if let Value::Table(table) = toml_value {
        flatten_toml_table(&table, String::new(), &mut config);
    }

    debug!("Parsed configuration: {:?}", config);
    Ok(config)
}

/// Recursively flatten TOML tables into section.subsection format
fn flatten_toml_table(table: &toml::Table, prefix: String, config: &mut Configuration) {
    for (key, value) in table {
        let section_name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Table(subtable) => {
                if subtable.values().all(|v| !matches!(v, Value::Table(_))) {
                    let section = config.entry(section_name).or_default();
                    for (subkey, subvalue) in subtable {
                        section.insert(subkey.clone(), toml_value_to_string(subvalue));
                    }
                } else {
                    flatten_toml_table(subtable, section_name, config);
                }
            }
            _ => {
                // top-level keys belong to [base]
                let section = if prefix.is_empty() { "base".to_string() } else { prefix.clone() };
                config.entry(section).or_default().insert(key.clone(), toml_value_to_string(value));
            }
        }
    }
}

/// Convert TOML Value to string representation
fn toml_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Array(_) | Value::Table(_) => value.to_string(),
        Value::Datetime(d) => d.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn test_toml_value_to_string_conversion() {
        assert_eq!(toml_value_to_string(&Value::String("test".to_string())), "test");
        assert_eq!(toml_value_to_string(&Value::Integer(42)), "42");
        assert_eq!(toml_value_to_string(&Value::Boolean(false)), "false");
    }

    #[test]
    fn test_parse_toml_config() {
        let toml_content = r#"
log-format = "json"

[base]
quiet = true

[assistant]
prompt = ">> "
exit-tokens = ["bye", "tạm biệt"]

[profile.demo]
greeting = "Demo"
"#;

        let config = parse_toml_config(toml_content).unwrap();

        assert_eq!(config["base"]["quiet"], "true");
        assert_eq!(config["base"]["log-format"], "json");
        assert_eq!(config["assistant"]["prompt"], ">> ");
        assert_eq!(config["profile.demo"]["greeting"], "Demo");
    }

    #[test]
    fn test_config_manager_value_retrieval() {
        let mut config = Configuration::new();

        let mut base_section = HashMap::new();
        base_section.insert("color".to_string(), "false".to_string());
        base_section.insert("prompt".to_string(), "$ ".to_string());
        config.insert("base".to_string(), base_section);

        let mut assistant_section = HashMap::new();
        assistant_section.insert("prompt".to_string(), "> ".to_string());
        config.insert("assistant".to_string(), assistant_section);

        let manager = ConfigManager::from_config(config);

        assert_eq!(manager.get_value("assistant", "color").unwrap(), "false");
        assert_eq!(manager.get_value("assistant", "prompt").unwrap(), "> ");
        assert!(manager.get_value("assistant", "missing").is_none());
    }

    #[test]
    fn test_config_manager_section_selection() {
        let mut config = Configuration::new();

        let mut assistant_section = HashMap::new();
        assistant_section.insert("run-mode".to_string(), "interactive".to_string());
        config.insert("assistant".to_string(), assistant_section);

        let mut scripted = HashMap::new();
        scripted.insert("run-mode".to_string(), "batch".to_string());
        config.insert("scripted".to_string(), scripted);

        let mut manager = ConfigManager::from_config(config);
        assert_eq!(manager.get_value("assistant", "run-mode").unwrap(), "interactive");

        manager.select_section("scripted".to_string());
        assert_eq!(manager.get_value("assistant", "run-mode").unwrap(), "batch");
    }

    #[test]
    fn test_config_manager_type_conversion() {
        let mut config = Configuration::new();

        let mut base_section = HashMap::new();
        base_section.insert("trim".to_string(), "true".to_string());
        base_section.insert("invalid-bool".to_string(), "maybe".to_string());
        base_section.insert("console-level".to_string(), "info".to_string());
        base_section.insert("invalid-level".to_string(), "invalid".to_string());
        base_section.insert("base-dir".to_string(), "/tmp/assistant".to_string());
        config.insert("base".to_string(), base_section);

        let manager = ConfigManager::from_config(config);

        assert_eq!(manager.get_bool("base", "trim").unwrap(), Some(true));
        assert!(manager.get_bool("base", "invalid-bool").is_err());
        assert!(manager.get_bool("base", "missing").unwrap().is_none());

        assert_eq!(manager.get_log_level("base", "console-level").unwrap(), Some(log::LevelFilter::Info));
        assert!(manager.get_log_level("base", "invalid-level").is_err());

        assert_eq!(manager.get_path("base", "base-dir").unwrap(), PathBuf::from("/tmp/assistant"));
    }

    #[test]
    fn test_get_list_forms() {
        let mut config = Configuration::new();
        let mut section = HashMap::new();
        section.insert("array".to_string(), r#"["bye", "ciao"]"#.to_string());
        section.insert("commas".to_string(), "bye, ciao,".to_string());
        section.insert("broken".to_string(), "[\"bye\"".to_string());
        config.insert("assistant".to_string(), section);
        let manager = ConfigManager::from_config(config);

        assert_eq!(manager.get_list("assistant", "array").unwrap().unwrap(), vec!["bye", "ciao"]);
        assert_eq!(manager.get_list("assistant", "commas").unwrap().unwrap(), vec!["bye", "ciao"]);
        assert!(manager.get_list("assistant", "broken").is_err());
        assert!(manager.get_list("assistant", "missing").unwrap().is_none());
    }

    #[test]
    fn test_assistant_config_defaults() {
        let manager = ConfigManager::from_config(Configuration::new());
        let config = manager.get_assistant_config().unwrap();

        assert_eq!(config, AssistantConfig::default());
        assert_eq!(config.exit_tokens, vec!["exit", "quit", "thoát"]);
        assert_eq!(config.resolved_plugin_dir(), PathBuf::from("./plugins"));
    }

    #[test]
    fn test_assistant_config_from_file() {
        let toml_content = r#"
[assistant]
base-dir = "/srv/assistant"
plugin-dir = "extra"
case-sensitive = true
exit-tokens = ["bye"]
farewell = "Ciao"
run-mode = "batch"
core = "fallthrough"
initial-version = "v2"
"#;

        let temp_file = NamedTempFile::new().unwrap();
        fs::write(&temp_file, toml_content).unwrap();

        let manager = ConfigManager::load_from_file(temp_file.path().to_path_buf()).unwrap();
        assert_eq!(manager.config_file_path().unwrap(), temp_file.path());

        let config = manager.get_assistant_config().unwrap();
        assert!(config.case_sensitive);
        assert!(config.trim);
        assert_eq!(config.exit_tokens, vec!["bye"]);
        assert_eq!(config.farewell, "Ciao");
        assert_eq!(config.run_mode.as_deref(), Some("batch"));
        assert_eq!(config.core.as_deref(), Some("fallthrough"));
        assert_eq!(config.initial_version.as_deref(), Some("v2"));
        assert_eq!(config.resolved_plugin_dir(), PathBuf::from("/srv/assistant/extra"));
    }

    #[test]
    fn test_assistant_config_rejects_empty_exit_tokens() {
        let toml_content = "[assistant]\nexit-tokens = []\n";
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(&temp_file, toml_content).unwrap();

        let manager = ConfigManager::load_from_file(temp_file.path().to_path_buf()).unwrap();
        assert!(manager.get_assistant_config().is_err());
    }
}
