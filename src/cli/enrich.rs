
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{check_required_directory, check_required_filename, FULL_VERSION};

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about)]
pub struct EnrichSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    biorempp_version: String,

    /// Input genome annotation file (.txt)
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "input")]
    #[clap(value_name = "TXT")]
    #[clap(help_heading = Some("Input/Output"))]
    pub input_fn: PathBuf,

    /// Directory containing the reference database files
    #[clap(short = 'd')]
    #[clap(long = "data-dir")]
    #[clap(value_name = "DIR")]
    #[clap(default_value = "data")]
    #[clap(help_heading = Some("Input/Output"))]
    pub data_dir: PathBuf,

    /// Output folder for the enriched tables
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_folder: PathBuf,

    /// Write comma-delimited .csv outputs instead of tab-delimited .tsv
    #[clap(long = "csv-output")]
    #[clap(help_heading = Some("Input/Output"))]
    pub csv_output: bool,

    /// Disables the categorical/numeric column optimization pass
    #[clap(long = "disable-type-optimization")]
    #[clap(help_heading = Some("Merge parameters"))]
    pub disable_type_optimization: bool,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8
}

pub fn check_enrich_settings(mut settings: EnrichSettings) -> anyhow::Result<EnrichSettings> {
    // hard code the version in
    settings.biorempp_version = FULL_VERSION.to_string();
    info!("BioRemPP version: {:?}", &settings.biorempp_version);
    info!("Sub-command: enrich");
    info!("Inputs:");

    check_required_filename(&settings.input_fn, "Annotation file")?;
    info!("\tAnnotation file: {:?}", &settings.input_fn);
    check_required_directory(&settings.data_dir, "Data directory")?;
    info!("\tData directory: {:?}", &settings.data_dir);

    info!("Outputs:");
    info!("\tOutput folder: {:?}", &settings.output_folder);
    info!("\tOutput format: {}", if settings.csv_output { "csv" } else { "tsv" });

    info!("Merge parameters:");
    info!("\tType optimization: {}", if settings.disable_type_optimization { "DISABLED" } else { "ENABLED" });

    Ok(settings)
}
