//! Logger setup for all commands
//!
//! Log messages go to stderr and to a log file in the output directory.
//!

use camino::Utf8Path;
use sv_evidence_filter::globals::PROGRAM_NAME;

use crate::cli;
use crate::os_utils::create_dir_all;

fn get_log_level(debug: bool) -> log::LevelFilter {
    if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

fn setup_logger(output_dir: &Utf8Path, debug: bool) -> Result<(), fern::InitError> {
    let log_filename = output_dir.join(format!("{PROGRAM_NAME}.log"));
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                PROGRAM_NAME,
                record.level(),
                message
            ))
        })
        .level(get_log_level(debug))
        .chain(std::io::stderr())
        .chain(fern::log_file(log_filename)?)
        .apply()?;
    Ok(())
}

/// Create the output directory, then start logging to a file in it
///
/// An existing output directory is only reused if `clobber` is set.
///
pub fn setup_output_dir_and_logger(output_dir: &Utf8Path, clobber: bool, debug: bool) {
    // No logger exists yet, so errors are reported the same way as command-line setting errors
    if !clobber {
        if let Err(msg) = cli::check_novel_dirname(output_dir, "Output directory") {
            eprintln!("Invalid command-line setting: {}", msg);
            std::process::exit(exitcode::USAGE);
        }
    }
    create_dir_all(output_dir, "output");
    if let Err(err) = setup_logger(output_dir, debug) {
        eprintln!("Unable to start logging in output directory '{output_dir}': {err}");
        std::process::exit(exitcode::CANTCREAT);
    }
}
