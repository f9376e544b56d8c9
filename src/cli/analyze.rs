
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{check_required_directory, check_required_filename, FULL_VERSION};
use crate::clustering::{DistanceMetric, LinkageMethod};

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about)]
pub struct AnalyzeSettings {
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

    /// Output folder for the analysis summary
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_folder: PathBuf,

    /// The compound class to group samples by
    #[clap(required = true)]
    #[clap(short = 'c')]
    #[clap(long = "compound-class")]
    #[clap(value_name = "CLASS")]
    #[clap(help_heading = Some("Analysis parameters"))]
    pub compound_class: String,

    /// The distance metric for the sample clustering
    #[clap(long = "metric")]
    #[clap(value_name = "METRIC")]
    #[clap(default_value = "euclidean")]
    #[clap(help_heading = Some("Analysis parameters"))]
    pub metric: DistanceMetric,

    /// The linkage method for the sample clustering
    #[clap(long = "method")]
    #[clap(value_name = "METHOD")]
    #[clap(default_value = "average")]
    #[clap(help_heading = Some("Analysis parameters"))]
    pub method: LinkageMethod,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8
}

pub fn check_analyze_settings(mut settings: AnalyzeSettings) -> anyhow::Result<AnalyzeSettings> {
    // hard code the version in
    settings.biorempp_version = FULL_VERSION.to_string();
    info!("BioRemPP version: {:?}", &settings.biorempp_version);
    info!("Sub-command: analyze");
    info!("Inputs:");

    check_required_filename(&settings.input_fn, "Annotation file")?;
    info!("\tAnnotation file: {:?}", &settings.input_fn);
    check_required_directory(&settings.data_dir, "Data directory")?;
    info!("\tData directory: {:?}", &settings.data_dir);

    info!("Outputs:");
    info!("\tOutput folder: {:?}", &settings.output_folder);

    info!("Analysis parameters:");
    info!("\tCompound class: {:?}", &settings.compound_class);
    info!("\tDistance metric: {}", settings.metric);
    info!("\tLinkage method: {}", settings.method);

    Ok(settings)
}
