
use log::{error, info};
use std::path::{Path, PathBuf};

use crate::data_types::schema::ReferenceSchema;
use crate::data_types::table::{Column, DataTable};
use crate::optimizer::optimize;
use crate::parsing::reference_db::{load_reference_table, LoadError};

/// Columns the toxicity merge requires on its input; it consumes the primary
/// merge's output, never the raw annotation table.
const TOXICITY_INPUT_COLUMNS: [&str; 4] = ["sample", "compoundclass", "cpd", "ko"];

/// Failures in the enrichment merge pipeline. These are raised (not returned
/// as boundary values), logged before propagation, and expected to be caught
/// by the presentation layer.
#[derive(thiserror::Error, Debug)]
pub enum MergeError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("column '{column}' must be present in the {side} table")]
    MissingColumn { column: String, side: String },
    #[error("join key '{column}' is not string-typed")]
    TypeMismatch { column: String }
}

/// The four enriched tables a full pipeline run produces.
#[derive(Clone, Debug)]
pub struct EnrichedTables {
    /// Primary compound database merge of the raw annotation table
    pub primary: DataTable,
    /// KEGG degradation-pathway merge of the raw annotation table
    pub degradation: DataTable,
    /// HADEG pathway-enzyme merge of the raw annotation table
    pub pathway_enzyme: DataTable,
    /// ToxCSM merge of the primary merge output
    pub toxicity: DataTable
}

/// Merges the annotation table with the primary compound database on `ko`.
/// # Arguments
/// * `input` - the tidy (sample, ko) table or a compatible enrichment
/// * `db_path` - database file override; defaults to `data/database.csv`
/// * `optimize_types` - whether to optimize both sides and the result
pub fn merge_with_primary(input: &DataTable, db_path: Option<&Path>, optimize_types: bool) -> Result<DataTable, MergeError> {
    merge_with_schema(input, db_path, optimize_types, ReferenceSchema::Primary)
}

/// Merges the annotation table with the KEGG degradation-pathway database on `ko`.
/// # Arguments
/// * `input` - the tidy (sample, ko) table or a compatible enrichment
/// * `db_path` - database file override; defaults to `data/kegg_degradation_pathways.csv`
/// * `optimize_types` - whether to optimize both sides and the result
pub fn merge_with_degradation(input: &DataTable, db_path: Option<&Path>, optimize_types: bool) -> Result<DataTable, MergeError> {
    merge_with_schema(input, db_path, optimize_types, ReferenceSchema::Degradation)
}

/// Merges the annotation table with the HADEG pathway-enzyme database on `ko`.
/// # Arguments
/// * `input` - the tidy (sample, ko) table or a compatible enrichment
/// * `db_path` - database file override; defaults to `data/database_hadegDB.csv`
/// * `optimize_types` - whether to optimize both sides and the result
pub fn merge_with_pathway_enzyme(input: &DataTable, db_path: Option<&Path>, optimize_types: bool) -> Result<DataTable, MergeError> {
    merge_with_schema(input, db_path, optimize_types, ReferenceSchema::PathwayEnzyme)
}

/// Merges a primary-merge output with the ToxCSM toxicity database on `cpd`.
/// The input must already carry `sample`, `compoundclass`, `cpd`, and `ko`;
/// it is projected down to exactly those four columns and deduplicated before
/// the join to bound the fan-out.
/// # Arguments
/// * `enriched` - the primary merge's output
/// * `db_path` - database file override; defaults to `data/database_toxcsm.csv`
/// * `optimize_types` - whether to optimize both sides and the result
pub fn merge_with_toxicity(enriched: &DataTable, db_path: Option<&Path>, optimize_types: bool) -> Result<DataTable, MergeError> {
    for column in TOXICITY_INPUT_COLUMNS {
        if !enriched.has_column(column) {
            let err = MergeError::MissingColumn {
                column: column.to_string(),
                side: "input".to_string()
            };
            error!("Toxicity merge rejected: {err}");
            return Err(err);
        }
    }

    let reduced = enriched.select(&TOXICITY_INPUT_COLUMNS).dedup_rows();
    info!("Toxicity merge input reduced to {} distinct rows", reduced.num_rows());
    merge_with_schema(&reduced, db_path, optimize_types, ReferenceSchema::Toxicity)
}

/// Runs the full enrichment: the three `ko`-keyed merges from the raw
/// annotation table, then the toxicity merge from the primary output.
/// # Arguments
/// * `input` - the tidy (sample, ko) table
/// * `data_dir` - directory holding the four reference database files
/// * `optimize_types` - whether each merge optimizes its operands and result
pub fn run_enrichment(input: &DataTable, data_dir: &Path, optimize_types: bool) -> Result<EnrichedTables, MergeError> {
    let primary = merge_with_primary(input, Some(&data_dir.join(ReferenceSchema::Primary.default_filename())), optimize_types)?;
    let degradation = merge_with_degradation(input, Some(&data_dir.join(ReferenceSchema::Degradation.default_filename())), optimize_types)?;
    let pathway_enzyme = merge_with_pathway_enzyme(input, Some(&data_dir.join(ReferenceSchema::PathwayEnzyme.default_filename())), optimize_types)?;
    let toxicity = merge_with_toxicity(&primary, Some(&data_dir.join(ReferenceSchema::Toxicity.default_filename())), optimize_types)?;

    Ok(EnrichedTables {
        primary,
        degradation,
        pathway_enzyme,
        toxicity
    })
}

/// The shared merge contract: resolve path, load, optimize copies, validate
/// the join key on both sides, inner-join, re-optimize. Caller-owned inputs
/// are never mutated.
fn merge_with_schema(
    input: &DataTable,
    db_path: Option<&Path>,
    optimize_types: bool,
    schema: ReferenceSchema
) -> Result<DataTable, MergeError> {
    let path: PathBuf = match db_path {
        Some(p) => p.to_path_buf(),
        None => Path::new("data").join(schema.default_filename())
    };
    info!("Merging against {schema} database at {path:?}");

    let mut database = load_reference_table(&path)?;
    let mut working = input.clone();
    if optimize_types {
        database = optimize(&database, schema);
        working = optimize(&working, schema);
    }

    let key = schema.join_key();
    for (side, table) in [("input", &working), ("database", &database)] {
        match table.column(key) {
            None => {
                let err = MergeError::MissingColumn {
                    column: key.to_string(),
                    side: side.to_string()
                };
                error!("{schema} merge rejected: {err}");
                return Err(err);
            },
            Some(Column::Float(_)) => {
                let err = MergeError::TypeMismatch { column: key.to_string() };
                error!("{schema} merge rejected: {err}");
                return Err(err);
            },
            Some(_) => {}
        }
    }

    let mut merged = working.inner_join(&database, key);
    if optimize_types {
        merged = optimize(&merged, schema);
    }
    info!("{schema} merge produced {} rows, {} columns", merged.num_rows(), merged.num_columns());
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::annotation::{records_to_table, AnnotationRecord};

    fn scenario_table() -> DataTable {
        records_to_table(&[
            AnnotationRecord::new("S1", "K00001"),
            AnnotationRecord::new("S1", "K00002"),
            AnnotationRecord::new("S2", "K00001"),
            AnnotationRecord::new("S2", "K00003")
        ])
    }

    fn fixture(name: &str) -> PathBuf {
        Path::new("test_data").join(name)
    }

    #[test]
    fn test_primary_merge_drops_unmatched_rows() {
        // the fixture database knows K00001 and K00002 but not K00003
        let merged = merge_with_primary(&scenario_table(), Some(&fixture("database.csv")), true).unwrap();

        assert_eq!(merged.num_rows(), 3);
        let pairs: Vec<(String, String)> = (0..merged.num_rows())
            .map(|r| (
                merged.str_value("sample", r).unwrap().to_string(),
                merged.str_value("ko", r).unwrap().to_string()
            ))
            .collect();
        assert_eq!(pairs, vec![
            ("S1".to_string(), "K00001".to_string()),
            ("S1".to_string(), "K00002".to_string()),
            ("S2".to_string(), "K00001".to_string())
        ]);
        assert!(merged.has_column("compoundclass"));
        assert!(merged.has_column("cpd"));
        // optimized result is dictionary-encoded on the declared columns
        assert!(merged.column("ko").unwrap().is_categorical());
    }

    #[test]
    fn test_merge_without_optimization_keeps_plain_columns() {
        let merged = merge_with_primary(&scenario_table(), Some(&fixture("database.csv")), false).unwrap();
        assert!(!merged.column("ko").unwrap().is_categorical());
        assert_eq!(merged.num_rows(), 3);
    }

    #[test]
    fn test_degradation_merge_fans_out_on_duplicate_keys() {
        // K00001 maps to two pathways in the fixture
        let merged = merge_with_degradation(&scenario_table(), Some(&fixture("kegg_degradation_pathways.csv")), true).unwrap();
        let k1_rows = merged.rows_where_eq("ko", "K00001");
        assert_eq!(k1_rows.len(), 4); // two samples x two pathways
        assert!(merged.has_column("pathname"));
    }

    #[test]
    fn test_pathway_enzyme_merge() {
        let merged = merge_with_pathway_enzyme(&scenario_table(), Some(&fixture("database_hadegDB.csv")), true).unwrap();
        assert!(merged.has_column("Gene"));
        assert!(merged.has_column("Pathway"));
        assert!(merged.has_column("compound_pathway"));
        // only K00001 is known to the HADEG fixture
        assert_eq!(merged.num_rows(), 2);
    }

    #[test]
    fn test_toxicity_merge_requires_primary_output() {
        let result = merge_with_toxicity(&scenario_table(), Some(&fixture("database_toxcsm.csv")), true);
        match result {
            Err(MergeError::MissingColumn { column, side }) => {
                assert_eq!(column, "compoundclass");
                assert_eq!(side, "input");
            },
            other => panic!("expected MissingColumn, got {other:?}")
        }
    }

    #[test]
    fn test_toxicity_merge_chain() {
        let primary = merge_with_primary(&scenario_table(), Some(&fixture("database.csv")), true).unwrap();
        let toxicity = merge_with_toxicity(&primary, Some(&fixture("database_toxcsm.csv")), true).unwrap();

        // exactly the four projected columns plus the ToxCSM annotations
        assert!(toxicity.has_column("sample"));
        assert!(toxicity.has_column("SMILES"));
        assert!(toxicity.has_column("value_NR_AR"));
        assert_eq!(toxicity.num_rows(), 3);

        // prefix coercion applied to the merged result
        match toxicity.column("value_NR_AR").unwrap() {
            Column::Float(values) => assert!(values[0].is_some()),
            other => panic!("expected float column, got {other:?}")
        }
    }

    #[test]
    fn test_missing_database_file() {
        let result = merge_with_primary(&scenario_table(), Some(&fixture("no_such_database.csv")), true);
        assert!(matches!(result, Err(MergeError::Load(LoadError::FileNotFound { .. }))));
    }

    #[test]
    fn test_missing_join_key_on_input() {
        let input = DataTable::from_str_columns(vec![
            ("sample", vec!["S1".to_string()])
        ]);
        let result = merge_with_primary(&input, Some(&fixture("database.csv")), true);
        match result {
            Err(MergeError::MissingColumn { column, side }) => {
                assert_eq!(column, "ko");
                assert_eq!(side, "input");
            },
            other => panic!("expected MissingColumn, got {other:?}")
        }
    }

    #[test]
    fn test_caller_input_never_mutated() {
        let input = scenario_table();
        let before = input.clone();
        let _ = merge_with_primary(&input, Some(&fixture("database.csv")), true).unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn test_full_enrichment() {
        let tables = run_enrichment(&scenario_table(), Path::new("test_data"), true).unwrap();
        assert!(tables.primary.num_rows() > 0);
        assert!(tables.degradation.num_rows() > 0);
        assert!(tables.pathway_enzyme.num_rows() > 0);
        assert!(tables.toxicity.num_rows() > 0);
    }
}
