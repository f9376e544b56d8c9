
use anyhow::Context;
use std::io::{BufWriter, Write};
use std::fs::File;
use std::path::Path;

/// Helper function that loads a file into some type, helpful generic
/// # Arguments
/// * `filename` - the file path to open and parse
/// # Errors
/// * if the file does not open properly
/// * if the deserialization throws errors
pub fn load_json<T: serde::de::DeserializeOwned>(filename: &Path) -> anyhow::Result<T> {
    let fp: Box<dyn std::io::Read> = if filename.extension().unwrap_or_default() == "gz" {
        Box::new(
            flate2::read::MultiGzDecoder::new(
                File::open(filename)?
            )
        )
    } else {
        Box::new(File::open(filename)?)
    };
    let result: T = serde_json::from_reader(fp)
        .with_context(|| format!("Error while deserializing {filename:?}:"))?;
    Ok(result)
}

/// This will save a generic serializable struct to JSON.
/// # Arguments
/// * `data` - the data in memory
/// * `out_filename` - user provided path to write to
/// # Errors
/// * if opening or writing to the file throw errors
/// * if JSON serialization throws errors
pub fn save_json<T: serde::Serialize>(data: &T, out_filename: &Path) -> anyhow::Result<()> {
    let file: Box<dyn std::io::Write> = if out_filename.extension().unwrap_or_default() == "gz" {
        Box::new(
            flate2::write::GzEncoder::new(
                File::create(out_filename)?,
                flate2::Compression::best()
            )
        )
    } else {
        Box::new(File::create(out_filename)?)
    };
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .with_context(|| format!("Error while serializing {out_filename:?}:"))?;
    writer.flush()
        .with_context(|| format!("Error while flushing output to {out_filename:?}:"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let data: Vec<String> = vec!["alpha".to_string(), "beta".to_string()];
        let out_fn = std::env::temp_dir().join("biorempp_json_io_test.json");
        save_json(&data, &out_fn).unwrap();
        let loaded: Vec<String> = load_json(&out_fn).unwrap();
        assert_eq!(data, loaded);
        std::fs::remove_file(&out_fn).unwrap();
    }

    #[test]
    fn test_json_gz_round_trip() {
        let data: Vec<u64> = vec![1, 2, 3];
        let out_fn = std::env::temp_dir().join("biorempp_json_io_test.json.gz");
        save_json(&data, &out_fn).unwrap();
        let loaded: Vec<u64> = load_json(&out_fn).unwrap();
        assert_eq!(data, loaded);
        std::fs::remove_file(&out_fn).unwrap();
    }
}
