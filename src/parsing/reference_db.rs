
use calamine::{open_workbook_auto, Reader};
use log::{error, info};
use std::path::{Path, PathBuf};

use crate::data_types::table::{Column, DataTable};

/// Failures while locating or reading a reference database file.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("reference database file not found: {path:?}")]
    FileNotFound { path: PathBuf },
    #[error("unsupported file format for {path:?}; use .csv or .xlsx")]
    UnsupportedFormat { path: PathBuf },
    #[error("error while reading reference database {path:?}: {source}")]
    UnexpectedIo {
        path: PathBuf,
        #[source]
        source: anyhow::Error
    }
}

/// Loads a reference database table from disk.
/// `.csv` files are `;`-delimited UTF-8 with a header row; `.xlsx` files are
/// read from their first worksheet with the first row as header. All cells are
/// loaded as strings; the type optimizer applies the per-variant coercions.
/// # Arguments
/// * `path` - the database file path
/// # Errors
/// * `FileNotFound` / `UnsupportedFormat` for the contract violations
/// * `UnexpectedIo` for read or parse failures, logged before propagation
pub fn load_reference_table(path: &Path) -> Result<DataTable, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound { path: path.to_path_buf() });
    }

    let extension = path.extension().unwrap_or_default();
    let result = if extension == "csv" {
        load_csv(path)
    } else if extension == "xlsx" {
        load_xlsx(path)
    } else {
        return Err(LoadError::UnsupportedFormat { path: path.to_path_buf() });
    };

    match result {
        Ok(table) => {
            info!("Loaded reference database {path:?}: {} rows, {} columns", table.num_rows(), table.num_columns());
            Ok(table)
        },
        Err(source) => {
            error!("Error while reading reference database {path:?}: {source}");
            Err(LoadError::UnexpectedIo { path: path.to_path_buf(), source })
        }
    }
}

/// Reads a `;`-delimited UTF-8 CSV into string columns.
fn load_csv(path: &Path) -> anyhow::Result<DataTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(path)?;

    let headers: Vec<String> = csv_reader.headers()?.iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for result in csv_reader.records() {
        let row = result?;
        for (i, cell) in row.iter().enumerate() {
            columns[i].push(cell.to_string());
        }
    }

    Ok(build_table(headers, columns))
}

/// Reads the first worksheet of an XLSX workbook into string columns.
fn load_xlsx(path: &Path) -> anyhow::Result<DataTable> {
    use anyhow::anyhow;

    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook.sheet_names().first().cloned()
        .ok_or_else(|| anyhow!("workbook has no worksheets"))?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => return Ok(DataTable::new())
    };

    let mut columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            columns[i].push(cell.to_string());
        }
    }

    Ok(build_table(headers, columns))
}

fn build_table(headers: Vec<String>, columns: Vec<Vec<String>>) -> DataTable {
    let mut table = DataTable::new();
    for (header, values) in headers.into_iter().zip(columns) {
        table.insert_column(&header, Column::Str(values));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_primary_fixture() {
        let table = load_reference_table(Path::new("test_data/database.csv")).unwrap();
        assert!(table.has_column("ko"));
        assert!(table.has_column("compoundclass"));
        assert!(table.has_column("compoundname"));
        assert!(table.has_column("cpd"));
        assert!(table.num_rows() > 0);
    }

    #[test]
    fn test_load_degradation_fixture() {
        let table = load_reference_table(Path::new("test_data/kegg_degradation_pathways.csv")).unwrap();
        assert!(table.has_column("ko"));
        assert!(table.has_column("pathname"));
        assert!(table.has_column("genesymbol"));
    }

    #[test]
    fn test_missing_file() {
        let result = load_reference_table(Path::new("test_data/does_not_exist.csv"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn test_unsupported_format() {
        // exists, but is neither .csv nor .xlsx
        let result = load_reference_table(Path::new("test_data/example_annotation.txt"));
        assert!(matches!(result, Err(LoadError::UnsupportedFormat { .. })));
    }
}
