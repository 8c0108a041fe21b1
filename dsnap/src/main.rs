// External crates
use clap::Parser;
use tracing::debug;

// Internal imports
use dsnap_core::dsnap_error;

// Local modules
mod cli;
mod commands;

use cli::Args;
use commands::execute_command;

fn main() {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    // Held until exit so buffered file output is flushed.
    let _log_guard = dsnap_logging::init_subscriber(default_level);

    debug!("Starting dsnap {:?}", args.command);

    // Only setup failures reach this point; skipped entries never fail the run.
    if let Err(e) = execute_command(args) {
        dsnap_error!("{:#}", e);
        std::process::exit(1);
    }
}
