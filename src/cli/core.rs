
use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::Path;

use crate::cli::analyze::AnalyzeSettings;
use crate::cli::enrich::EnrichSettings;

/// The released crate version, shared by every subcommand.
pub const FULL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[clap(author, version = FULL_VERSION, about)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands
}

/// BioRemPP, bioremediation potential profiling from genome annotation data.
/// Select a subcommand to see more usage information:
#[derive(Subcommand)]
pub enum Commands {
    /// Validates an annotation file and enriches it against the reference databases
    Enrich(Box<EnrichSettings>),
    /// Derives compound-profile groups and a sample clustering from an annotation file
    Analyze(Box<AnalyzeSettings>)
}

pub fn get_cli() -> Cli {
    Cli::parse()
}

/// Checks if a file exists and will otherwise exit
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
pub fn check_required_filename(filename: &Path, label: &str) -> anyhow::Result<()> {
    if !filename.exists() {
        bail!("{} does not exist: \"{}\"", label, filename.display());
    }

    // file exists
    Ok(())
}

/// Checks that a directory exists and will otherwise exit
/// # Arguments
/// * `dirname` - the directory path to check for
/// * `label` - the label to use for error messages
pub fn check_required_directory(dirname: &Path, label: &str) -> anyhow::Result<()> {
    if !dirname.is_dir() {
        bail!("{} is not a directory: \"{}\"", label, dirname.display());
    }

    Ok(())
}
