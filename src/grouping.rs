
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, info};
use rustc_hash::FxHashMap as HashMap;
use rustc_hash::FxHashSet as HashSet;

use crate::data_types::table::{Column, DataTable};

/// Separator for the canonical compound-set key. Compound names are free text,
/// so the key uses a control character that cannot appear in them.
const SET_KEY_SEPARATOR: char = '\x1f';

/// Failures in the compound-profile grouping engine.
#[derive(thiserror::Error, Debug)]
pub enum GroupingError {
    #[error("column '{column}' must be present in the input table")]
    MissingColumn { column: String },
    #[error("no data found for compound class: {class}")]
    NoDataForClass { class: String },
    #[error("input table is empty")]
    EmptyInput,
    #[error("failed to find a group covering the remaining compounds")]
    NoCoveringGroup
}

/// Groups samples of one compound class by identical compound profiles.
///
/// The table is filtered to `selected_class`; each sample's distinct
/// (non-empty) compound-name set is reduced to a canonical sorted-and-joined
/// key, and samples sharing a key receive the same `"<class> - Group <n>"`
/// label, numbered in first-discovery order. The canonical key gives
/// linear-time grouping without pairwise set comparison. Samples with an
/// empty compound set receive no group label.
/// # Arguments
/// * `selected_class` - the compound class to filter and group
/// * `table` - a table carrying `compoundclass`, `sample`, and `compoundname`
/// # Errors
/// * `MissingColumn` if a required column is absent
/// * `NoDataForClass` if the filter leaves zero rows
pub fn group_by_class(selected_class: &str, table: &DataTable) -> Result<DataTable, GroupingError> {
    for column in ["compoundclass", "sample", "compoundname"] {
        if !table.has_column(column) {
            return Err(GroupingError::MissingColumn { column: column.to_string() });
        }
    }

    info!("Filtering data by compound class: '{selected_class}'");
    let selected_rows = table.rows_where_eq("compoundclass", selected_class);
    if selected_rows.is_empty() {
        return Err(GroupingError::NoDataForClass { class: selected_class.to_string() });
    }
    let filtered = table.gather(&selected_rows);

    // distinct compound set per sample, in row order
    let mut sample_compounds: IndexMap<String, Vec<String>> = IndexMap::new();
    for row in 0..filtered.num_rows() {
        let sample = filtered.str_value("sample", row).unwrap_or_default().to_string();
        let compound = filtered.str_value("compoundname", row).unwrap_or_default().to_string();
        let compounds = sample_compounds.entry(sample).or_default();
        if !compound.is_empty() && !compounds.contains(&compound) {
            compounds.push(compound);
        }
    }

    // canonical set key -> group number, in first-discovery order
    let mut group_numbers: IndexMap<String, usize> = IndexMap::new();
    let mut sample_labels: HashMap<String, String> = HashMap::default();
    for (sample, compounds) in sample_compounds.iter() {
        if compounds.is_empty() {
            continue;
        }
        let key = compounds.iter().sorted().join(&SET_KEY_SEPARATOR.to_string());
        let next_number = group_numbers.len() + 1;
        let number = *group_numbers.entry(key).or_insert(next_number);
        let label = format!("{selected_class} - Group {number}");
        debug!("Sample '{sample}' assigned to '{label}'");
        sample_labels.insert(sample.clone(), label);
    }
    info!("Identified {} distinct groups for class '{selected_class}'", group_numbers.len());

    // attach the grupo column; ungrouped samples keep an empty label
    let labels: Vec<String> = (0..filtered.num_rows())
        .map(|row| {
            let sample = filtered.str_value("sample", row).unwrap_or_default();
            sample_labels.get(sample).cloned().unwrap_or_default()
        })
        .collect();
    let mut grouped = filtered;
    grouped.insert_column("grupo", Column::Str(labels));
    Ok(grouped)
}

/// Greedy approximate minimum set cover over the discovered groups.
///
/// Repeatedly selects the remaining group covering the most not-yet-covered
/// compounds, until every compound in the table is covered. Groups are
/// visited in stable label order, so ties always resolve to the
/// lexicographically first label and the result is reproducible. The result
/// is an approximation, not a guaranteed minimum.
/// # Arguments
/// * `grouped` - the output of [`group_by_class`], carrying `grupo` and `compoundname`
/// # Errors
/// * `MissingColumn` / `EmptyInput` on contract violations
/// * `NoCoveringGroup` if a step finds zero remaining coverage; this cannot
///   happen for tables produced by [`group_by_class`] and is guarded defensively
pub fn minimize_groups(grouped: &DataTable) -> Result<Vec<String>, GroupingError> {
    for column in ["grupo", "compoundname"] {
        if !grouped.has_column(column) {
            return Err(GroupingError::MissingColumn { column: column.to_string() });
        }
    }
    if grouped.is_empty() {
        return Err(GroupingError::EmptyInput);
    }

    info!("Minimizing groups to cover all compounds");

    // coverage per group, visited in stable label order
    let mut group_compounds: IndexMap<String, HashSet<String>> = IndexMap::new();
    for row in 0..grouped.num_rows() {
        let label = grouped.str_value("grupo", row).unwrap_or_default();
        let compound = grouped.str_value("compoundname", row).unwrap_or_default();
        if label.is_empty() || compound.is_empty() {
            continue;
        }
        group_compounds.entry(label.to_string()).or_default().insert(compound.to_string());
    }
    group_compounds.sort_keys();

    let mut remaining: HashSet<String> = grouped.distinct_str_values("compoundname")
        .into_iter()
        .filter(|c| !c.is_empty())
        .collect();

    let mut selected: Vec<String> = Vec::new();
    while !remaining.is_empty() {
        let mut best_label: Option<&str> = None;
        let mut best_coverage = 0usize;
        for (label, compounds) in group_compounds.iter() {
            if selected.iter().any(|s| s == label) {
                continue;
            }
            let coverage = compounds.intersection(&remaining).count();
            if coverage > best_coverage {
                best_coverage = coverage;
                best_label = Some(label.as_str());
            }
        }

        let best_label = match best_label {
            Some(label) => label.to_string(),
            None => return Err(GroupingError::NoCoveringGroup)
        };

        let covered = &group_compounds[&best_label];
        remaining.retain(|c| !covered.contains(c));
        debug!("Selected group '{best_label}', {} compounds remaining", remaining.len());
        selected.push(best_label);
    }

    info!("Total selected groups: {}", selected.len());
    Ok(selected)
}
