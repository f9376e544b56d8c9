
use crate::data_types::table::DataTable;

/// One (sample, ortholog) observation from an uploaded annotation file.
/// Duplicates are meaningful and preserved; downstream pivots count them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AnnotationRecord {
    /// User-provided sample identifier, non-empty after trimming
    pub sample: String,
    /// KEGG Orthology identifier matching `K\d+`
    pub ko: String
}

impl AnnotationRecord {
    pub fn new(sample: &str, ko: &str) -> Self {
        Self {
            sample: sample.to_string(),
            ko: ko.to_string()
        }
    }
}

/// Converts parsed annotation records into the tidy two-column table every
/// merge consumes. Row order follows the upload order.
pub fn records_to_table(records: &[AnnotationRecord]) -> DataTable {
    let samples: Vec<String> = records.iter().map(|r| r.sample.clone()).collect();
    let orthologs: Vec<String> = records.iter().map(|r| r.ko.clone()).collect();
    DataTable::from_str_columns(vec![
        ("sample", samples),
        ("ko", orthologs)
    ])
}
