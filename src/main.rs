
use log::{LevelFilter, error, info, warn};
use std::time::Instant;

use biorempp::cli::analyze::{AnalyzeSettings, check_analyze_settings};
use biorempp::cli::core::{Commands, get_cli};
use biorempp::cli::enrich::{EnrichSettings, check_enrich_settings};
use biorempp::clustering::{ClusterConfigBuilder, DistanceCache, calculate_sample_clustering};
use biorempp::data_types::annotation::records_to_table;
use biorempp::grouping::{group_by_class, minimize_groups};
use biorempp::merge::{merge_with_primary, run_enrichment};
use biorempp::parsing::annotation::load_annotation_file;
use biorempp::util::json_io::save_json;
use biorempp::writers::analysis_writer::AnalysisSummary;
use biorempp::writers::table_writer::write_table;

/// Maps the CLI verbosity count to the logger level and initializes logging.
fn setup_logging(verbosity: u8) {
    let filter_level: LevelFilter = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();
}

fn run_enrich(settings: EnrichSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    setup_logging(settings.verbosity);

    let settings = match check_enrich_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // create the primary output folder
    info!("Creating output folder at {:?}...", settings.output_folder);
    match std::fs::create_dir_all(&settings.output_folder) {
        Ok(()) => {},
        Err(e) => {
            error!("Error while creating output folder: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    // save the CLI options
    let cli_json = settings.output_folder.join("cli_settings.json");
    info!("Saving CLI options to {cli_json:?}...");
    if let Err(e) = save_json(&settings, &cli_json) {
        error!("Error while saving CLI options: {e}");
        std::process::exit(exitcode::IOERR);
    }

    // validate and parse the annotation upload
    info!("Validating annotation file...");
    let (records, warnings) = match load_annotation_file(&settings.input_fn) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!("Error while validating annotation file: {e:#}");
            std::process::exit(exitcode::DATAERR);
        }
    };
    if !warnings.is_empty() {
        warn!("Upload flagged {} structural warnings", warnings.len());
    }
    let annotation_table = records_to_table(&records);

    // run all four reference database merges
    info!("Enriching against reference databases...");
    let enriched = match run_enrichment(&annotation_table, &settings.data_dir, !settings.disable_type_optimization) {
        Ok(tables) => tables,
        Err(e) => {
            error!("Error while enriching annotation data: {e:#}");
            std::process::exit(exitcode::DATAERR);
        }
    };

    // save each enriched table
    let extension = if settings.csv_output { "csv" } else { "tsv" };
    let outputs = [
        ("primary", &enriched.primary),
        ("degradation", &enriched.degradation),
        ("pathway_enzyme", &enriched.pathway_enzyme),
        ("toxicity", &enriched.toxicity)
    ];
    for (label, table) in outputs {
        let out_fn = settings.output_folder.join(format!("{label}.{extension}"));
        info!("Saving {label} table to {out_fn:?}...");
        if let Err(e) = write_table(table, &out_fn) {
            error!("Error while saving {label} table: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    }

    info!("Enrichment completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn run_analyze(settings: AnalyzeSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    setup_logging(settings.verbosity);

    let settings = match check_analyze_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // create the primary output folder
    info!("Creating output folder at {:?}...", settings.output_folder);
    match std::fs::create_dir_all(&settings.output_folder) {
        Ok(()) => {},
        Err(e) => {
            error!("Error while creating output folder: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    // save the CLI options
    let cli_json = settings.output_folder.join("cli_settings.json");
    info!("Saving CLI options to {cli_json:?}...");
    if let Err(e) = save_json(&settings, &cli_json) {
        error!("Error while saving CLI options: {e}");
        std::process::exit(exitcode::IOERR);
    }

    // validate and parse the annotation upload
    info!("Validating annotation file...");
    let (records, warnings) = match load_annotation_file(&settings.input_fn) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!("Error while validating annotation file: {e:#}");
            std::process::exit(exitcode::DATAERR);
        }
    };
    if !warnings.is_empty() {
        warn!("Upload flagged {} structural warnings", warnings.len());
    }
    let annotation_table = records_to_table(&records);

    // the grouping and clustering both consume the primary enrichment
    info!("Merging with the primary compound database...");
    let db_path = settings.data_dir.join(biorempp::data_types::schema::ReferenceSchema::Primary.default_filename());
    let primary = match merge_with_primary(&annotation_table, Some(&db_path), true) {
        Ok(table) => table,
        Err(e) => {
            error!("Error while merging annotation data: {e:#}");
            std::process::exit(exitcode::DATAERR);
        }
    };

    // compound-profile grouping plus the greedy minimum cover
    info!("Grouping samples by compound profile...");
    let grouped = match group_by_class(&settings.compound_class, &primary) {
        Ok(table) => table,
        Err(e) => {
            error!("Error while grouping samples: {e:#}");
            std::process::exit(exitcode::DATAERR);
        }
    };
    let minimized = match minimize_groups(&grouped) {
        Ok(labels) => labels,
        Err(e) => {
            error!("Error while minimizing groups: {e:#}");
            std::process::exit(exitcode::DATAERR);
        }
    };
    let group_labels: Vec<String> = grouped.distinct_str_values("grupo")
        .into_iter()
        .filter(|label| !label.is_empty())
        .collect();
    info!("Selected {} of {} groups", minimized.len(), group_labels.len());

    // hierarchical clustering of samples by shared orthologs
    info!("Clustering samples...");
    let cluster_config = match ClusterConfigBuilder::default()
        .metric(settings.metric)
        .method(settings.method)
        .build() {
        Ok(cc) => cc,
        Err(e) => {
            error!("Error while building cluster config: {e:?}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };
    let cache = DistanceCache::new();
    let clustering = match calculate_sample_clustering(&primary, &cluster_config, &cache) {
        Ok(matrix) => matrix,
        Err(e) => {
            error!("Error while clustering samples: {e:#}");
            std::process::exit(exitcode::DATAERR);
        }
    };

    // save the grouped table and the analysis summary
    let grouped_fn = settings.output_folder.join("grouped.tsv");
    info!("Saving grouped table to {grouped_fn:?}...");
    if let Err(e) = write_table(&grouped, &grouped_fn) {
        error!("Error while saving grouped table: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    let summary = AnalysisSummary {
        compound_class: settings.compound_class.clone(),
        group_labels,
        minimized_groups: minimized,
        clustering,
        warnings: warnings.iter().map(|w| w.to_string()).collect()
    };
    let summary_fn = settings.output_folder.join("analysis_summary.json");
    info!("Saving analysis summary to {summary_fn:?}...");
    if let Err(e) = summary.write(&summary_fn) {
        error!("Error while saving analysis summary: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    info!("Analysis completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Enrich(settings) => {
            run_enrich(*settings);
        },
        Commands::Analyze(settings) => {
            run_analyze(*settings);
        }
    }

    info!("Process finished successfully.");
}
