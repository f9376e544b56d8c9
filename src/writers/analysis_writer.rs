
use serde::Serialize;
use std::path::Path;

use crate::clustering::LinkageMatrix;
use crate::util::json_io::save_json;

/// The derived analytical structures for one request, bundled for export.
/// This is the JSON payload the presentation layer renders from.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisSummary {
    /// The compound class the grouping ran on
    pub compound_class: String,
    /// Every discovered group label, in first-discovery order
    pub group_labels: Vec<String>,
    /// The greedy minimum-cover selection, in selection order
    pub minimized_groups: Vec<String>,
    /// The hierarchical clustering of samples by shared orthologs
    pub clustering: LinkageMatrix,
    /// Non-fatal upload warnings, rendered as text
    pub warnings: Vec<String>
}

impl AnalysisSummary {
    /// Saves the summary as (optionally gzipped) JSON.
    /// # Arguments
    /// * `filename` - the output path; `.gz` enables compression
    pub fn write(&self, filename: &Path) -> anyhow::Result<()> {
        save_json(self, filename)
    }
}
