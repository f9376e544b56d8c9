
use lazy_static::lazy_static;
use rustc_hash::FxHashMap as HashMap;

/// The four reference database variants the merge pipeline can enrich against.
/// Each variant carries its join key, its default on-disk location, and a
/// declared list of known-categorical columns used by the type optimizer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum_macros::Display, strum_macros::EnumString, serde::Serialize)]
pub enum ReferenceSchema {
    /// Primary compound database: gene, compound, and regulatory annotations keyed by `ko`
    #[strum(ascii_case_insensitive, serialize = "primary")]
    Primary,
    /// KEGG degradation-pathway database keyed by `ko`
    #[strum(ascii_case_insensitive, serialize = "degradation")]
    Degradation,
    /// HADEG pathway-enzyme database keyed by `ko`
    #[strum(ascii_case_insensitive, serialize = "pathway_enzyme")]
    PathwayEnzyme,
    /// ToxCSM toxicity-prediction database keyed by `cpd`
    #[strum(ascii_case_insensitive, serialize = "toxicity")]
    Toxicity
}

lazy_static! {
    /// Known-categorical columns per schema variant. Columns absent from a
    /// concrete table are skipped silently, tolerating schema drift in the
    /// externally owned reference files.
    static ref CATEGORICAL_COLUMNS: HashMap<ReferenceSchema, &'static [&'static str]> = {
        let mut table: HashMap<ReferenceSchema, &'static [&'static str]> = HashMap::default();
        table.insert(ReferenceSchema::Primary, &[
            "ko", "genesymbol", "genename", "cpd", "compoundclass",
            "referenceAG", "compoundname", "enzyme_activity", "sample"
        ]);
        table.insert(ReferenceSchema::Degradation, &[
            "ko", "pathname", "genesymbol", "sample"
        ]);
        table.insert(ReferenceSchema::PathwayEnzyme, &[
            "Gene", "ko", "Pathway", "compound_pathway", "sample"
        ]);
        table.insert(ReferenceSchema::Toxicity, &[
            "SMILES", "cpd", "ChEBI", "compoundname", "sample"
        ]);
        table
    };
}

impl ReferenceSchema {
    /// The shared join key used when merging user data against this variant.
    pub fn join_key(&self) -> &'static str {
        match self {
            ReferenceSchema::Toxicity => "cpd",
            _ => "ko"
        }
    }

    /// The default database filename inside a data directory.
    pub fn default_filename(&self) -> &'static str {
        match self {
            ReferenceSchema::Primary => "database.csv",
            ReferenceSchema::Degradation => "kegg_degradation_pathways.csv",
            ReferenceSchema::PathwayEnzyme => "database_hadegDB.csv",
            ReferenceSchema::Toxicity => "database_toxcsm.csv"
        }
    }

    /// The declared known-categorical columns for this variant.
    pub fn categorical_columns(&self) -> &'static [&'static str] {
        CATEGORICAL_COLUMNS[self]
    }

    /// True if this variant applies the `value_*` / `label_*` prefix coercions.
    pub fn has_prefix_rules(&self) -> bool {
        matches!(self, ReferenceSchema::Toxicity)
    }
}
