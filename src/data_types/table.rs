
use indexmap::IndexMap;
use rustc_hash::FxHashMap as HashMap;
use std::hash::{Hash, Hasher};

/// A dictionary-encoded string column.
/// Distinct values are stored once, in first-appearance order, and each row holds a code into that dictionary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoricalColumn {
    /// Distinct values in first-appearance order
    categories: Vec<String>,
    /// Lookup from a value to its dictionary code
    lookup: HashMap<String, u32>,
    /// Per-row dictionary codes
    codes: Vec<u32>
}

impl CategoricalColumn {
    /// Builds a categorical column from plain string values.
    pub fn from_values<S: AsRef<str>>(values: &[S]) -> Self {
        let mut column = Self::default();
        for value in values {
            column.push(value.as_ref());
        }
        column
    }

    /// Appends one value, extending the dictionary if it is new.
    pub fn push(&mut self, value: &str) {
        let code = match self.lookup.get(value) {
            Some(&c) => c,
            None => {
                let c = self.categories.len() as u32;
                self.categories.push(value.to_string());
                self.lookup.insert(value.to_string(), c);
                c
            }
        };
        self.codes.push(code);
    }

    /// Returns the decoded value at a row.
    pub fn value(&self, row: usize) -> &str {
        &self.categories[self.codes[row] as usize]
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// The dictionary, in first-appearance order.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Builds a new column containing the given rows, in order.
    /// The dictionary is preserved, so unused categories may remain after a selective gather.
    fn gather(&self, rows: &[usize]) -> Self {
        Self {
            categories: self.categories.clone(),
            lookup: self.lookup.clone(),
            codes: rows.iter().map(|&r| self.codes[r]).collect()
        }
    }
}

/// A single column of a [`DataTable`].
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    /// Plain UTF-8 strings, one per row
    Str(Vec<String>),
    /// Dictionary-encoded strings; the compact form produced by the type optimizer
    Categorical(CategoricalColumn),
    /// 32-bit floats with missing entries represented as `None`
    Float(Vec<Option<f32>>)
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Str(values) => values.len(),
            Column::Categorical(col) => col.len(),
            Column::Float(values) => values.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, Column::Categorical(_))
    }

    /// Returns the string value at a row, or `None` for float columns.
    /// Join keys and grouping columns are always string-typed, so this is the
    /// accessor every key-based operation goes through.
    pub fn str_value(&self, row: usize) -> Option<&str> {
        match self {
            Column::Str(values) => Some(&values[row]),
            Column::Categorical(col) => Some(col.value(row)),
            Column::Float(_) => None
        }
    }

    /// Renders the cell at a row for display or export. Missing floats render empty.
    pub fn display_value(&self, row: usize) -> String {
        match self {
            Column::Str(values) => values[row].clone(),
            Column::Categorical(col) => col.value(row).to_string(),
            Column::Float(values) => match values[row] {
                Some(v) => format!("{v}"),
                None => String::new()
            }
        }
    }

    /// Builds a new column containing the given rows, in order.
    pub fn gather(&self, rows: &[usize]) -> Column {
        match self {
            Column::Str(values) => Column::Str(rows.iter().map(|&r| values[r].clone()).collect()),
            Column::Categorical(col) => Column::Categorical(col.gather(rows)),
            Column::Float(values) => Column::Float(rows.iter().map(|&r| values[r]).collect())
        }
    }
}

/// A small column-oriented table: an ordered map from column name to equal-length columns.
/// This is the working representation for the annotation table, the loaded reference
/// databases, and every enriched merge result. It is deliberately not a query engine;
/// it supports exactly the operations the enrichment pipeline needs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataTable {
    /// Columns in insertion order
    columns: IndexMap<String, Column>,
    /// Shared row count across all columns
    num_rows: usize
}

impl DataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor from named string columns; mostly used by parsers and tests.
    /// # Panics
    /// * if the columns do not share a single length
    pub fn from_str_columns(columns: Vec<(&str, Vec<String>)>) -> Self {
        let mut table = Self::new();
        for (name, values) in columns {
            table.insert_column(name, Column::Str(values));
        }
        table
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    /// Inserts or replaces a column. Replacing keeps the original column position.
    /// # Panics
    /// * if the column length does not match the existing row count (on a non-empty table)
    pub fn insert_column(&mut self, name: &str, column: Column) {
        if self.columns.is_empty() {
            self.num_rows = column.len();
        } else {
            assert_eq!(column.len(), self.num_rows, "column '{name}' length mismatch");
        }
        self.columns.insert(name.to_string(), column);
    }

    /// Returns the string value of a cell, or `None` for float columns or unknown columns.
    pub fn str_value(&self, name: &str, row: usize) -> Option<&str> {
        self.column(name).and_then(|c| c.str_value(row))
    }

    /// Builds a new table containing the given rows, in order. Duplicate indices are allowed.
    pub fn gather(&self, rows: &[usize]) -> DataTable {
        let columns = self.columns.iter()
            .map(|(name, column)| (name.clone(), column.gather(rows)))
            .collect();
        DataTable {
            columns,
            num_rows: rows.len()
        }
    }

    /// Returns the row indices whose string value in `column` equals `value`.
    /// Unknown or float columns yield no rows.
    pub fn rows_where_eq(&self, column: &str, value: &str) -> Vec<usize> {
        match self.column(column) {
            Some(col) => (0..self.num_rows)
                .filter(|&r| col.str_value(r) == Some(value))
                .collect(),
            None => Vec::new()
        }
    }

    /// Projects the table down to the named columns, in the given order.
    /// # Panics
    /// * if a requested column does not exist; callers validate presence first
    pub fn select(&self, names: &[&str]) -> DataTable {
        let mut table = DataTable::new();
        for &name in names {
            let column = self.column(name)
                .unwrap_or_else(|| panic!("select on unknown column '{name}'"));
            table.insert_column(name, column.clone());
        }
        table.num_rows = self.num_rows;
        table
    }

    /// Removes duplicate rows, keeping the first occurrence of each.
    /// Row identity is the rendered cell tuple, so it is stable across
    /// plain and dictionary-encoded representations of the same data.
    pub fn dedup_rows(&self) -> DataTable {
        let mut seen: HashMap<Vec<String>, ()> = HashMap::default();
        let mut keep: Vec<usize> = Vec::new();
        for row in 0..self.num_rows {
            let key: Vec<String> = self.columns.values()
                .map(|c| c.display_value(row))
                .collect();
            if seen.insert(key, ()).is_none() {
                keep.push(row);
            }
        }
        self.gather(&keep)
    }

    /// Distinct string values of a column in first-appearance order.
    pub fn distinct_str_values(&self, column: &str) -> Vec<String> {
        let mut seen: HashMap<String, ()> = HashMap::default();
        let mut distinct = Vec::new();
        if let Some(col) = self.column(column) {
            for row in 0..self.num_rows {
                if let Some(value) = col.str_value(row) {
                    if seen.insert(value.to_string(), ()).is_none() {
                        distinct.push(value.to_string());
                    }
                }
            }
        }
        distinct
    }

    /// Inner join with another table on a shared single key column.
    /// Result rows follow this table's row order, with each row repeated once per
    /// matching row (in order) on the right. Output columns are this table's columns
    /// followed by the right table's non-key columns; a right column whose name
    /// collides with a left column is suffixed with `_db`.
    /// # Arguments
    /// * `right` - the table to join against
    /// * `key` - the shared key column, which must be string-typed on both sides
    pub fn inner_join(&self, right: &DataTable, key: &str) -> DataTable {
        let right_key = right.column(key).expect("join key missing on right table");

        // index the right side: key value -> row indices
        let mut right_rows: HashMap<&str, Vec<usize>> = HashMap::default();
        for row in 0..right.num_rows {
            if let Some(value) = right_key.str_value(row) {
                right_rows.entry(value).or_default().push(row);
            }
        }

        // left-order traversal, expanding each match
        let left_key = self.column(key).expect("join key missing on left table");
        let mut left_take: Vec<usize> = Vec::new();
        let mut right_take: Vec<usize> = Vec::new();
        for row in 0..self.num_rows {
            if let Some(value) = left_key.str_value(row) {
                if let Some(matches) = right_rows.get(value) {
                    for &r in matches {
                        left_take.push(row);
                        right_take.push(r);
                    }
                }
            }
        }

        let mut joined = self.gather(&left_take);
        for (name, column) in right.columns.iter() {
            if name == key {
                continue;
            }
            let out_name = if joined.has_column(name) {
                format!("{name}_db")
            } else {
                name.clone()
            };
            joined.insert_column(&out_name, column.gather(&right_take));
        }
        joined.num_rows = left_take.len();
        joined
    }

    /// A content signature over shape, column names, and every rendered cell.
    /// Two tables with identical content produce identical signatures within a
    /// process run; used as the clustering distance-cache key component.
    pub fn content_signature(&self) -> u64 {
        let mut hasher = rustc_hash::FxHasher::default();
        self.num_rows.hash(&mut hasher);
        for (name, column) in self.columns.iter() {
            name.hash(&mut hasher);
            for row in 0..self.num_rows {
                column.display_value(row).hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}
