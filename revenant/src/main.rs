use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use revenant::Args;
use tracing::{error, warn};

fn main() -> ExitCode {
    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .init();

    // Ctrl-C powers the emulator off so that the battery save is still written
    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupt);
    if let Err(err) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
        warn!("Could not install the Ctrl-C handler: {err}");
    }

    match revenant::run(&config, interrupt) {
        Ok(summary) => {
            if config.serial && !summary.serial.is_empty() {
                println!();
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
