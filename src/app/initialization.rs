//! Application initialization and configuration

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::Path;

use crate::assistant::{
    Assistant, BootstrapOptions, InputSettings, NormalizationPolicy, RunSettings,
};
use crate::config::{AssistantConfig, ConfigManager};
use crate::plugin::{
    FileBasedDiscovery, PluginCatalog, PluginDiscovery, PluginRegistrar, RegistrationReport,
};
use crate::{cli, logging};

pub fn load_configuration(args: &cli::Args) -> Result<ConfigManager> {
    let mut manager = if let Some(config_file) = &args.config_file {
        debug!("Loading configuration from explicit file: {}", config_file.display());
        ConfigManager::load_from_file(config_file.clone())?
    } else {
        ConfigManager::load()?
    };

    if let Some(section_name) = &args.config_name {
        manager.select_section(section_name.clone());
    }

    Ok(manager)
}

pub fn configure_logging(args: &cli::Args, config: &ConfigManager) -> Result<logging::LogConfig> {
    use log::LevelFilter;
    use std::str::FromStr;

    let console_level = if args.debug {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Error
    } else {
        match config.get_log_level("base", "console-level") {
            Ok(Some(level)) => level,
            Ok(None) => LevelFilter::Warn,
            Err(e) => {
                eprintln!("Invalid console-level in config, using warn: {}", e);
                LevelFilter::Warn
            }
        }
    };

    let format = if args.log_format != "text" {
        logging::LogFormat::from_str(&args.log_format)
            .map_err(|e| anyhow::anyhow!(e))?
    } else {
        match config.get_value("base", "log-format") {
            Some(format_str) => logging::LogFormat::from_str(format_str)
                .map_err(|e| anyhow::anyhow!(e))
                .context("Invalid log-format in config")?,
            None => logging::LogFormat::Text,
        }
    };

    let log_file_path = args.log_file.clone()
        .or_else(|| config.get_path("base", "log-file"));

    let file_log_level = match &args.log_file_level {
        Some(level_str) => Some(logging::parse_log_level(level_str)?),
        None => config.get_log_level("base", "file-log-level")
            .context("Invalid file-log-level in config")?,
    };

    let (destination, file_level) = match (log_file_path, file_log_level) {
        (Some(file_path), level) => {
            let level = level.unwrap_or(console_level);
            (logging::LogDestination::Both(file_path), Some(level))
        }
        (None, None) => (logging::LogDestination::Console, None),
        (None, Some(_)) => {
            return Err(anyhow::anyhow!("file-log-level is set but no log file is configured"));
        }
    };

    Ok(logging::LogConfig {
        console_level,
        file_level,
        format,
        destination,
    })
}

/// Merge command line overrides over the configured assistant settings
pub fn resolve_settings(args: &cli::Args, config: &ConfigManager) -> Result<AssistantConfig> {
    let mut settings = config.get_assistant_config()?;

    if let Some(base_dir) = &args.base_dir {
        settings.base_dir = base_dir.clone();
    }
    if let Some(plugin_dir) = &args.plugin_dir {
        settings.plugin_dir = plugin_dir.clone();
    }
    if args.run_mode.is_some() {
        settings.run_mode = args.run_mode.clone();
    }
    if args.core.is_some() {
        settings.core = args.core.clone();
    }
    if args.version_manager.is_some() {
        settings.version_manager = args.version_manager.clone();
    }
    if args.input_processor.is_some() {
        settings.input_processor = args.input_processor.clone();
    }
    if args.use_version.is_some() {
        settings.initial_version = args.use_version.clone();
    }
    if args.no_color {
        settings.color = false;
    }

    debug!("Resolved assistant settings: {:?}", settings);
    Ok(settings)
}

pub fn run_settings(settings: &AssistantConfig, args: &cli::Args) -> RunSettings {
    RunSettings {
        prompt: settings.prompt.clone(),
        greeting: settings.greeting.clone(),
        color: settings.color,
        echo: args.echo,
        script: args.script.clone(),
    }
}

pub fn input_settings(settings: &AssistantConfig) -> InputSettings {
    InputSettings {
        exit_tokens: settings.exit_tokens.clone(),
        farewell: settings.farewell.clone(),
    }
}

pub fn bootstrap_options(settings: &AssistantConfig, args: &cli::Args) -> BootstrapOptions {
    use crate::assistant::Capability;

    let mut options = BootstrapOptions {
        base_dir: Some(settings.base_dir.clone()),
        input: input_settings(settings),
        run: run_settings(settings, args),
        ..BootstrapOptions::default()
    };
    let requested = [
        (Capability::Core, &settings.core),
        (Capability::VersionManager, &settings.version_manager),
        (Capability::InputProcessor, &settings.input_processor),
        (Capability::RunMode, &settings.run_mode),
    ];
    for (capability, name) in requested {
        if let Some(name) = name {
            options = options.request(capability, name.clone());
        }
    }
    options
}

/// Apply the configured dispatch settings to the bootstrapped core
pub fn build_assistant(assistant: Assistant, settings: &AssistantConfig) -> Assistant {
    assistant
        .with_normalization(NormalizationPolicy {
            trim: settings.trim,
            case_sensitive: settings.case_sensitive,
        })
        .with_unknown_reply(settings.unknown_reply.clone())
        .with_plugin_dir(settings.resolved_plugin_dir())
}

/// Discover plugins in `plugin_dir` and register them in order.
///
/// Files that fail to load are reported and skipped; only an unusable
/// folder is an error.
pub fn load_plugins(
    assistant: &mut Assistant,
    plugin_dir: &Path,
    catalog: &PluginCatalog,
) -> Result<RegistrationReport> {
    let report = FileBasedDiscovery::new(plugin_dir)
        .discover(catalog)
        .with_context(|| format!("Failed to scan plugin folder {}", plugin_dir.display()))?;

    for failed in &report.failed {
        eprintln!("Skipping plugin file {}: {}", failed.file.display(), failed.error);
    }
    for skipped in &report.skipped {
        debug!("Plugin '{}' is disabled", skipped.name);
    }

    let registration = PluginRegistrar::register_all(assistant, report.loaded);
    for (name, error) in &registration.failed {
        eprintln!("Plugin '{}' failed to register: {}", name, error);
    }
    if registration.registered.is_empty() {
        warn!("No plugins registered from {}", plugin_dir.display());
    }
    info!("Plugins ready: {}", registration.registered.join(", "));
    Ok(registration)
}

/// Make the configured initial version current
pub fn apply_initial_version(assistant: &mut Assistant, settings: &AssistantConfig) -> Result<()> {
    let Some(version) = &settings.initial_version else {
        return Ok(());
    };
    if !assistant.versions_mut().switch_version(version) {
        return Err(anyhow::anyhow!(
            "Unknown version '{}' (known: {})",
            version,
            assistant.versions().version_names().join(", ")
        ));
    }
    info!("Starting with version '{}'", version);
    Ok(())
}
