//! Application execution: assemble the assistant and run it

use anyhow::{Context, Result};
use colored::Colorize;
use log::{debug, info};
use std::io;

use crate::assistant::{bootstrap, BatchMode, Capability, RunMode, RunSummary, StrategyRegistry};
use crate::config::{AssistantConfig, ConfigManager};
use crate::output::format_compact_table;
use crate::plugin::{builtin, list_descriptors, DescriptorState, PluginCatalog};
use crate::cli;

use super::initialization::{
    apply_initial_version, bootstrap_options, build_assistant, load_plugins, resolve_settings, run_settings,
};

/// Run the assistant as the command line asks.
///
/// Returns the summary of the session, or `None` when a maintenance flag
/// (`--init`, `--list-plugins`, `--list-strategies`) handled the call.
pub fn run_assistant(args: &cli::Args, config: &ConfigManager) -> Result<Option<RunSummary>> {
    let settings = resolve_settings(args, config)?;
    if !settings.color {
        colored::control::set_override(false);
    }

    if args.init {
        handle_init(&settings)?;
        return Ok(None);
    }
    if args.list_plugins {
        handle_list_plugins(&settings)?;
        return Ok(None);
    }

    let registry = StrategyRegistry::builtin();
    if args.list_strategies {
        handle_list_strategies(&registry, &settings)?;
        return Ok(None);
    }

    let summary = run_session(args, &settings, &registry, &builtin::default_catalog())?;
    Ok(Some(summary))
}

/// Bootstrap the strategies, load plugins, then run
pub fn run_session(
    args: &cli::Args,
    settings: &AssistantConfig,
    registry: &StrategyRegistry,
    catalog: &PluginCatalog,
) -> Result<RunSummary> {
    let options = bootstrap_options(settings, args);
    let parts = bootstrap(registry, &options).context("Failed to assemble the assistant")?;
    debug!("Bootstrap: {:?}", parts);

    let mut assistant = build_assistant(parts.assistant, settings);
    load_plugins(&mut assistant, &settings.resolved_plugin_dir(), catalog)?;
    apply_initial_version(&mut assistant, settings)?;

    let mut run_mode: Box<dyn RunMode> = if args.is_one_shot() {
        Box::new(BatchMode::from_commands(
            &args.command,
            Box::new(io::stdout()),
            run_settings(settings, args),
        ))
    } else {
        parts.run_mode
    };

    info!("Running in {} mode with {} input", run_mode.name(), parts.input_processor.name());
    let summary = run_mode
        .run(&mut assistant, parts.input_processor.as_ref())
        .context("Run loop failed")?;
    info!(
        "Session finished: {} processed, {} handled, {} unknown, {} errors",
        summary.processed, summary.handled, summary.unknown, summary.errors
    );
    Ok(summary)
}

/// Write sample plugin and strategy descriptors
pub fn handle_init(settings: &AssistantConfig) -> Result<()> {
    let plugin_dir = settings.resolved_plugin_dir();
    let mut written = builtin::write_sample_descriptors(&plugin_dir)
        .with_context(|| format!("Failed to write plugin descriptors to {}", plugin_dir.display()))?;
    written.extend(
        builtin::write_sample_strategies(&settings.base_dir)
            .with_context(|| format!("Failed to write strategy descriptors under {}", settings.base_dir.display()))?,
    );

    if written.is_empty() {
        println!("All sample descriptors already exist; nothing written.");
    } else {
        println!("{}", "Wrote descriptors:".bold());
        for path in &written {
            println!("  {}", path.display());
        }
    }
    Ok(())
}

pub fn handle_list_plugins(settings: &AssistantConfig) -> Result<()> {
    let plugin_dir = settings.resolved_plugin_dir();
    let statuses = list_descriptors(&plugin_dir)
        .with_context(|| format!("Failed to read plugin folder {}", plugin_dir.display()))?;

    println!("{} {}", "Plugins in".bold(), plugin_dir.display());
    if statuses.is_empty() {
        println!("  (none; run with --init to create samples)");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = statuses
        .into_iter()
        .map(|status| {
            let state = match status.state {
                DescriptorState::Enabled => "enabled".green().to_string(),
                DescriptorState::Disabled => "disabled".yellow().to_string(),
                DescriptorState::Invalid(reason) => format!("{} ({})", "invalid".red(), reason),
            };
            vec![status.name, state, status.description]
        })
        .collect();
    println!("{}", format_compact_table(&["Name", "State", "Description"], &rows));
    Ok(())
}

pub fn handle_list_strategies(registry: &StrategyRegistry, settings: &AssistantConfig) -> Result<()> {
    for capability in Capability::ALL {
        let report = registry
            .discover(&settings.base_dir, capability)
            .with_context(|| format!("Failed to scan {} descriptors", capability))?;

        println!("{} ({}/)", capability.to_string().bold(), capability.folder());
        println!("  built-in: {}", registry.implementations(capability).join(", "));
        for descriptor in &report.loaded {
            let marker = if descriptor.preferred { " (preferred)" } else { "" };
            println!("  {} -> {}{}", descriptor.name, descriptor.implementation, marker);
        }
        for failed in &report.failed {
            println!("  {} {}", "rejected:".red(), failed.error);
        }
    }
    Ok(())
}
