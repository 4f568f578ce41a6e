use clap::{Parser, ArgAction};
use anyhow::Result;
use std::path::PathBuf;
use log::debug;

use crate::assistant::Capability;

/// Versioned plugin assistant
#[derive(Parser, Debug)]
#[command(name = "vassist")]
#[command(about = "A command assistant whose commands, versions and run loop are all plugins")]
#[command(version)]
pub struct Args {
    /// Base directory holding the plugin and strategy folders
    #[arg(short = 'b', long = "base-dir", value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Plugin folder (relative paths are resolved against the base directory)
    #[arg(short = 'p', long = "plugin-dir", value_name = "DIR")]
    pub plugin_dir: Option<PathBuf>,

    /// Run mode strategy (interactive, batch, or a discovered name)
    #[arg(short = 'm', long = "run-mode", value_name = "NAME")]
    pub run_mode: Option<String>,

    /// Dispatch core strategy (standard, fallthrough, or a discovered name)
    #[arg(long = "core", value_name = "NAME")]
    pub core: Option<String>,

    /// Version manager strategy (standard, traced, or a discovered name)
    #[arg(long = "version-manager", value_name = "NAME")]
    pub version_manager: Option<String>,

    /// Input processor strategy (standard, verbatim, or a discovered name)
    #[arg(long = "input-processor", value_name = "NAME")]
    pub input_processor: Option<String>,

    /// Run a command and exit; may be repeated
    #[arg(short = 'c', long = "command", value_name = "TEXT", action = ArgAction::Append)]
    pub command: Vec<String>,

    /// Command file for batch runs
    #[arg(short = 's', long = "script", value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Print each batch command before its reply
    #[arg(long)]
    pub echo: bool,

    /// Version to make current after plugins are registered
    #[arg(long = "use-version", value_name = "NAME")]
    pub use_version: Option<String>,

    /// Write sample plugin and strategy descriptors, then exit
    #[arg(long)]
    pub init: bool,

    /// List plugin descriptors and their state, then exit
    #[arg(long = "list-plugins")]
    pub list_plugins: bool,

    /// List available strategies per capability, then exit
    #[arg(long = "list-strategies")]
    pub list_strategies: bool,

    /// Verbose output (debug level logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug output (trace level logging)
    #[arg(long)]
    pub debug: bool,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log file path for file output
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL")]
    pub log_file_level: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Configuration section name
    #[arg(long, value_name = "SECTION")]
    pub config_name: Option<String>,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl Args {
    /// Strategy names requested on the command line
    pub fn requested_strategies(&self) -> Vec<(Capability, &str)> {
        [
            (Capability::Core, self.core.as_deref()),
            (Capability::VersionManager, self.version_manager.as_deref()),
            (Capability::InputProcessor, self.input_processor.as_deref()),
            (Capability::RunMode, self.run_mode.as_deref()),
        ]
        .into_iter()
        .filter_map(|(capability, name)| name.map(|n| (capability, n)))
        .collect()
    }

    /// Whether the run ends after the given `-c` commands
    pub fn is_one_shot(&self) -> bool {
        !self.command.is_empty()
    }
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    let args = Args::parse();
    debug!("Parsed CLI arguments: {:?}", args);
    args
}

/// Validate CLI argument combinations
pub fn validate_args(args: &Args) -> Result<()> {
    debug!("Validating CLI argument combinations");

    let log_flags_count = [args.verbose, args.quiet, args.debug]
        .iter()
        .filter(|&&flag| flag)
        .count();

    if log_flags_count > 1 {
        return Err(anyhow::anyhow!(
            "Conflicting log level flags: only one of --verbose, --quiet, or --debug may be specified"
        ));
    }

    match args.log_format.to_lowercase().as_str() {
        "text" | "json" => {},
        _ => return Err(anyhow::anyhow!(
            "Invalid log format '{}'. Valid options: text, json", args.log_format
        )),
    }

    if let Some(ref level) = args.log_file_level {
        match level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {},
            _ => return Err(anyhow::anyhow!(
                "Invalid log file level '{}'. Valid levels: error, warn, info, debug, trace", level
            )),
        }
    }

    if args.log_file_level.is_some() && args.log_file.is_none() {
        return Err(anyhow::anyhow!(
            "--log-file-level requires --log-file to be specified"
        ));
    }

    if args.is_one_shot() {
        if args.script.is_some() {
            return Err(anyhow::anyhow!("--command and --script cannot be used together"));
        }
        if args.run_mode.is_some() {
            return Err(anyhow::anyhow!("--command runs its commands directly; drop --run-mode"));
        }
        if args.command.iter().all(|c| c.trim().is_empty()) {
            return Err(anyhow::anyhow!("--command needs a non-empty command"));
        }
    }

    let listing_flags = [args.init, args.list_plugins, args.list_strategies]
        .iter()
        .filter(|&&flag| flag)
        .count();
    if listing_flags > 1 {
        return Err(anyhow::anyhow!(
            "Only one of --init, --list-plugins, or --list-strategies may be specified"
        ));
    }

    debug!("CLI arguments validated successfully");
    Ok(())
}
