
use std::fs::File;
use std::path::Path;

use crate::data_types::table::DataTable;

/// Writes a table to a delimited text file.
/// The delimiter is `,` for filenames ending in `.csv` and a tab otherwise;
/// missing float entries render as empty cells.
/// # Arguments
/// * `table` - the table to export
/// * `filename` - the output path (tsv/csv)
pub fn write_table(table: &DataTable, filename: &Path) -> csv::Result<()> {
    let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
    let delimiter: u8 = if is_csv { b',' } else { b'\t' };
    let mut csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)?;

    let headers: Vec<&str> = table.column_names().collect();
    csv_writer.write_record(&headers)?;

    for row in 0..table.num_rows() {
        let record: Vec<String> = headers.iter()
            .map(|&name| table.column(name).unwrap().display_value(row))
            .collect();
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tsv_round_trip() {
        let table = DataTable::from_str_columns(vec![
            ("sample", vec!["S1".to_string(), "S2".to_string()]),
            ("ko", vec!["K00001".to_string(), "K00002".to_string()])
        ]);
        let out_fn = std::env::temp_dir().join("biorempp_table_writer_test.tsv");
        write_table(&table, &out_fn).unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(&out_fn).unwrap();
        assert_eq!(reader.headers().unwrap(), &csv::StringRecord::from(vec!["sample", "ko"]));
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1], &csv::StringRecord::from(vec!["S2", "K00002"]));

        std::fs::remove_file(&out_fn).unwrap();
    }
}
