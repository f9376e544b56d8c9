
use log::debug;

use crate::data_types::schema::ReferenceSchema;
use crate::data_types::table::{CategoricalColumn, Column, DataTable};

/// Normalizes column representations for one schema variant, returning a
/// transformed copy. Declared known columns become dictionary-encoded
/// categoricals; the toxicity variant additionally coerces `value_*` columns
/// to 32-bit floats (unparsable entries become missing) and `label_*` columns
/// to categoricals. Columns absent from the table are skipped silently, and
/// already-optimized columns are left untouched, so the operation is
/// idempotent and tolerant of schema drift in the reference files.
/// # Arguments
/// * `table` - the table to optimize; the caller's copy is never mutated
/// * `schema` - the variant whose declared columns apply
pub fn optimize(table: &DataTable, schema: ReferenceSchema) -> DataTable {
    let mut optimized = table.clone();

    for &name in schema.categorical_columns() {
        to_categorical(&mut optimized, name);
    }

    if schema.has_prefix_rules() {
        let names: Vec<String> = optimized.column_names().map(|n| n.to_string()).collect();
        for name in names {
            if name.starts_with("value_") {
                to_float(&mut optimized, &name);
            } else if name.starts_with("label_") {
                to_categorical(&mut optimized, &name);
            }
        }
    }

    optimized
}

/// Converts a string column to its dictionary-encoded form in place.
/// Absent, float, and already-categorical columns are left as-is.
fn to_categorical(table: &mut DataTable, name: &str) {
    let values: Vec<String> = match table.column(name) {
        Some(Column::Str(values)) => values.clone(),
        _ => return
    };
    debug!("Optimizing column '{name}' to categorical");
    table.insert_column(name, Column::Categorical(CategoricalColumn::from_values(&values)));
}

/// Coerces a string-typed column to `f32` in place; entries that do not parse
/// become missing. Absent and already-float columns are left as-is.
fn to_float(table: &mut DataTable, name: &str) {
    let column = match table.column(name) {
        Some(Column::Float(_)) | None => return,
        Some(column) => column
    };
    let parsed: Vec<Option<f32>> = (0..column.len())
        .map(|row| column.str_value(row).and_then(|v| v.trim().parse::<f32>().ok()))
        .collect();
    debug!("Optimizing column '{name}' to float");
    table.insert_column(name, Column::Float(parsed));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toxicity_table() -> DataTable {
        DataTable::from_str_columns(vec![
            ("cpd", vec!["C00001".to_string(), "C00002".to_string()]),
            ("compoundname", vec!["water".to_string(), "atp".to_string()]),
            ("value_NR_AR", vec!["0.53".to_string(), "not-a-number".to_string()]),
            ("label_NR_AR", vec!["High Safety".to_string(), "Low Toxicity".to_string()]),
            ("SMILES", vec!["O".to_string(), "Nc1ncnc2".to_string()])
        ])
    }

    #[test]
    fn test_declared_columns_become_categorical() {
        let table = DataTable::from_str_columns(vec![
            ("ko", vec!["K00001".to_string(), "K00001".to_string()]),
            ("sample", vec!["S1".to_string(), "S2".to_string()]),
            ("free_text", vec!["a".to_string(), "b".to_string()])
        ]);
        let optimized = optimize(&table, ReferenceSchema::Primary);

        assert!(optimized.column("ko").unwrap().is_categorical());
        assert!(optimized.column("sample").unwrap().is_categorical());
        // undeclared columns keep their representation
        assert!(!optimized.column("free_text").unwrap().is_categorical());
        // values are unchanged
        assert_eq!(optimized.str_value("ko", 1), Some("K00001"));
    }

    #[test]
    fn test_absent_columns_skipped_silently() {
        let table = DataTable::from_str_columns(vec![
            ("ko", vec!["K00001".to_string()])
        ]);
        // Primary declares many columns this table does not have
        let optimized = optimize(&table, ReferenceSchema::Primary);
        assert_eq!(optimized.num_columns(), 1);
    }

    #[test]
    fn test_toxicity_prefix_rules() {
        let optimized = optimize(&toxicity_table(), ReferenceSchema::Toxicity);

        match optimized.column("value_NR_AR").unwrap() {
            Column::Float(values) => {
                assert_eq!(values[0], Some(0.53));
                assert_eq!(values[1], None);
            },
            other => panic!("expected float column, got {other:?}")
        }
        assert!(optimized.column("label_NR_AR").unwrap().is_categorical());
        assert!(optimized.column("SMILES").unwrap().is_categorical());
    }

    #[test]
    fn test_optimize_is_idempotent() {
        let once = optimize(&toxicity_table(), ReferenceSchema::Toxicity);
        let twice = optimize(&once, ReferenceSchema::Toxicity);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let table = toxicity_table();
        let _ = optimize(&table, ReferenceSchema::Toxicity);
        assert!(!table.column("cpd").unwrap().is_categorical());
    }
}
