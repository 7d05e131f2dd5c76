mod filter;
mod shared;
mod utils;

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use simple_error::{SimpleResult, bail};

use self::filter::validate_and_fix_filter_settings;
pub use self::filter::{FilterCommandSettings, write_filter_command_settings};
use self::shared::validate_and_fix_shared_settings;
pub use self::shared::SharedSettings;

#[derive(Subcommand)]
pub enum Commands {
    /// Filter breakpoint evidence, keeping only evidence the classifier scores above threshold
    Filter(FilterCommandSettings),

    /// Write the classifier feature vector and probability for every breakpoint evidence record
    Features(FilterCommandSettings),
}

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
#[clap(propagate_version = true, rename_all = "kebab_case")]
pub struct Settings {
    #[command(flatten)]
    pub shared: SharedSettings,

    #[command(subcommand)]
    pub command: Commands,
}

impl Settings {
    pub fn get_output_dir(&self) -> &Utf8Path {
        match &self.command {
            Commands::Filter(x) | Commands::Features(x) => &x.output_dir,
        }
    }
}

/// Checks if a directory does not exist
///
pub fn check_novel_dirname(dirname: &Utf8Path, label: &str) -> SimpleResult<()> {
    if dirname.exists() {
        bail!("{} already exists: \"{}\"", label, dirname);
    }
    Ok(())
}

/// Validate settings and update parameters that can't be processed by clap
///
pub fn validate_and_fix_settings_impl(mut settings: Settings) -> SimpleResult<Settings> {
    settings.shared = validate_and_fix_shared_settings(settings.shared)?;

    settings.command = match settings.command {
        Commands::Filter(x) => Commands::Filter(validate_and_fix_filter_settings(x)?),
        Commands::Features(x) => Commands::Features(validate_and_fix_filter_settings(x)?),
    };

    Ok(settings)
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
pub fn validate_and_fix_settings(settings: Settings) -> Settings {
    match validate_and_fix_settings_impl(settings) {
        Ok(x) => x,
        Err(msg) => {
            eprintln!("Invalid command-line setting: {}", msg);
            std::process::exit(exitcode::USAGE);
        }
    }
}

pub fn parse_settings() -> Settings {
    Settings::parse()
}
