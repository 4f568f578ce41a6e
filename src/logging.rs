// Logging module for vassist
// Structured logging to the console, a file, or both, as text or JSON.
//
// Console output goes to stderr so it never mixes with assistant replies on
// stdout. Console and file have independent levels.
//
// Example usage:
// ```
// let config = LogConfig {
//     console_level: LevelFilter::Warn,
//     file_level: Some(LevelFilter::Debug),
//     format: LogFormat::Json,
//     destination: LogDestination::Both(PathBuf::from("vassist.log")),
// };
// init_logger(config)?;
// log::info!("Assistant started");
// ```

use log::{Level, LevelFilter};
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

/// Log output format options
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}. Valid options: text, json", s)),
        }
    }
}

/// Log destination options
#[derive(Debug, Clone, PartialEq)]
pub enum LogDestination {
    Console,
    File(PathBuf),
    Both(PathBuf),
}

/// JSON log entry structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLogEntry {
    pub timestamp: String,
    pub level: String,
    /// Module that emitted the record
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub console_level: LevelFilter,
    pub file_level: Option<LevelFilter>,
    pub format: LogFormat,
    pub destination: LogDestination,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::Warn,
            file_level: None,
            format: LogFormat::Text,
            destination: LogDestination::Console,
        }
    }
}

impl LogConfig {
    /// Highest level any destination accepts
    pub fn max_level(&self) -> LevelFilter {
        match self.file_level {
            Some(file_level) if file_level > self.console_level => file_level,
            _ => self.console_level,
        }
    }
}

/// Logger behind the `log` facade
pub struct AssistantLogger {
    config: LogConfig,
}

impl AssistantLogger {
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    fn format_timestamp() -> String {
        let now: DateTime<Local> = Local::now();
        now.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn format_text_message(&self, level: Level, target: &str, message: &str) -> String {
        let timestamp = Self::format_timestamp();
        format!("{} [{}] {}: {}", timestamp, level.to_string().to_uppercase(), target, message)
    }

    fn format_json_message(&self, level: Level, target: &str, message: &str) -> Result<String> {
        let entry = JsonLogEntry {
            timestamp: Self::format_timestamp(),
            level: level.to_string().to_uppercase(),
            target: target.to_string(),
            message: message.to_string(),
            detail: None,
        };

        serde_json::to_string(&entry)
            .context("Failed to serialize log entry to JSON")
    }

    fn should_log_to_console(&self, level: Level) -> bool {
        match self.config.destination {
            LogDestination::File(_) => false,
            _ => level <= self.config.console_level,
        }
    }

    fn should_log_to_file(&self, level: Level) -> bool {
        match (&self.config.destination, self.config.file_level) {
            (LogDestination::Console, _) | (_, None) => false,
            (_, Some(file_level)) => level <= file_level,
        }
    }

    fn file_path(&self) -> Option<&Path> {
        match &self.config.destination {
            LogDestination::File(path) | LogDestination::Both(path) => Some(path),
            LogDestination::Console => None,
        }
    }

    fn write_to_console(&self, formatted_message: &str) -> Result<()> {
        writeln!(io::stderr(), "{}", formatted_message)
            .context("Failed to write to console")
    }

    fn write_to_file(&self, formatted_message: &str, file_path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)
            .with_context(|| format!("Failed to open log file: {}", file_path.display()))?;

        writeln!(file, "{}", formatted_message)
            .context("Failed to write to log file")
    }
}

impl log::Log for AssistantLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.should_log_to_console(metadata.level()) ||
        self.should_log_to_file(metadata.level())
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let message = record.args().to_string();
        let level = record.level();
        let target = record.target();

        let formatted_message = match self.config.format {
            LogFormat::Text => self.format_text_message(level, target, &message),
            LogFormat::Json => {
                match self.format_json_message(level, target, &message) {
                    Ok(json) => json,
                    Err(e) => {
                        eprintln!("JSON formatting error: {}. Falling back to text format.", e);
                        self.format_text_message(level, target, &message)
                    }
                }
            }
        };

        if self.should_log_to_console(level) {
            if let Err(e) = self.write_to_console(&formatted_message) {
                eprintln!("Console logging error: {}", e);
            }
        }

        if self.should_log_to_file(level) {
            if let Some(path) = self.file_path() {
                if let Err(e) = self.write_to_file(&formatted_message, path) {
                    eprintln!("File logging error: {}", e);
                    // a file-only destination falls back to the console
                    if matches!(self.config.destination, LogDestination::File(_)) {
                        let _ = self.write_to_console(&formatted_message);
                    }
                }
            }
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Initialize the logging system with the given configuration
pub fn init_logger(config: LogConfig) -> Result<()> {
    let max_level = config.max_level();
    let logger = AssistantLogger::new(config);

    log::set_boxed_logger(Box::new(logger))
        .context("Failed to set global logger")?;

    log::set_max_level(max_level);

    Ok(())
}

/// Convert string to LevelFilter
pub fn parse_log_level(level_str: &str) -> Result<LevelFilter> {
    match level_str.to_lowercase().as_str() {
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        "off" => Ok(LevelFilter::Off),
        _ => Err(anyhow::anyhow!("Invalid log level: {}. Valid levels: error, warn, info, debug, trace, off", level_str)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;
    use tempfile::TempDir;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(parse_log_level("error").unwrap(), LevelFilter::Error);
        assert_eq!(parse_log_level("Debug").unwrap(), LevelFilter::Debug);
        assert_eq!(parse_log_level("off").unwrap(), LevelFilter::Off);
        assert!(parse_log_level("loud").is_err());
    }

    #[test]
    fn test_timestamp_format() {
        let timestamp = AssistantLogger::format_timestamp();
        assert_eq!(timestamp.len(), 19);
        assert_eq!(timestamp.chars().nth(4), Some('-'));
        assert_eq!(timestamp.chars().nth(10), Some(' '));
        assert_eq!(timestamp.chars().nth(16), Some(':'));
    }

    #[test]
    fn test_text_and_json_formatting() {
        let logger = AssistantLogger::new(LogConfig::default());

        let text = logger.format_text_message(Level::Info, "vassist::plugin", "Loaded ping");
        assert!(text.contains("[INFO] vassist::plugin: Loaded ping"));

        let json = logger.format_json_message(Level::Warn, "vassist::plugin", "Skipped").unwrap();
        let entry: JsonLogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry.level, "WARN");
        assert_eq!(entry.target, "vassist::plugin");
        assert_eq!(entry.message, "Skipped");
        assert!(!json.contains("detail"));
    }

    #[test]
    fn test_max_level_covers_both_destinations() {
        let config = LogConfig {
            console_level: LevelFilter::Warn,
            file_level: Some(LevelFilter::Debug),
            format: LogFormat::Text,
            destination: LogDestination::Both(PathBuf::from("x.log")),
        };
        assert_eq!(config.max_level(), LevelFilter::Debug);
        assert_eq!(LogConfig::default().max_level(), LevelFilter::Warn);
    }

    #[test]
    fn test_file_destination_writes_records() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vassist.log");
        let logger = AssistantLogger::new(LogConfig {
            console_level: LevelFilter::Off,
            file_level: Some(LevelFilter::Info),
            format: LogFormat::Json,
            destination: LogDestination::File(path.clone()),
        });

        logger.log(
            &log::Record::builder()
                .level(Level::Info)
                .target("vassist::test")
                .args(format_args!("hello"))
                .build(),
        );
        logger.log(
            &log::Record::builder()
                .level(Level::Debug)
                .target("vassist::test")
                .args(format_args!("filtered"))
                .build(),
        );

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains(r#""message":"hello""#));
    }
}
