use anyhow::Result;
use log::error;
use std::process;

use vassist::{app, cli, logging};

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Application error: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Exit code 0, or 2 when a one-shot run had failing commands
fn run() -> Result<i32> {
    let args = cli::parse_args();

    cli::validate_args(&args)?;

    let config_manager = app::load_configuration(&args)?;

    let log_config = app::configure_logging(&args, &config_manager)?;
    logging::init_logger(log_config)?;

    let summary = app::run_assistant(&args, &config_manager)?;
    let code = match summary {
        Some(summary) if args.is_one_shot() && summary.errors > 0 => 2,
        _ => 0,
    };
    Ok(code)
}
