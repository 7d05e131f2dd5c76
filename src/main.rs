mod cli;
mod filter_run;
mod logger;
mod os_utils;

use std::{error, process};

use hhmmss::Hhmmss;
use log::info;
use sv_evidence_filter::globals::{PROGRAM_NAME, PROGRAM_VERSION};

use crate::cli::Commands;
use crate::filter_run::{run_features, run_filter};
use crate::logger::setup_output_dir_and_logger;

fn run(settings: &cli::Settings) -> Result<(), Box<dyn error::Error>> {
    info!("Starting {PROGRAM_NAME} {PROGRAM_VERSION}");
    info!(
        "cmdline: {}",
        std::env::args().collect::<Vec<_>>().join(" ")
    );
    info!("Running on {} threads", settings.shared.thread_count);

    let start = std::time::Instant::now();

    match &settings.command {
        Commands::Filter(x) => {
            run_filter(x, settings.shared.thread_count)?;
        }
        Commands::Features(x) => {
            run_features(x, settings.shared.thread_count)?;
        }
    }

    info!(
        "{PROGRAM_NAME} completed. Total Runtime: {}",
        start.elapsed().hhmmssxxx()
    );
    Ok(())
}

fn main() {
    let settings = cli::validate_and_fix_settings(cli::parse_settings());

    // Setup logger, including creation of the output directory for the log file:
    setup_output_dir_and_logger(
        settings.get_output_dir(),
        settings.shared.clobber,
        settings.shared.debug,
    );

    if let Err(err) = run(&settings) {
        eprintln!("{err}");
        process::exit(2);
    }
}
