
use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, info, warn};
use std::path::Path;

use crate::data_types::annotation::AnnotationRecord;

/// Hard upload ceiling applied by [`process_upload`], in megabytes.
pub const MAX_UPLOAD_SIZE_MB: usize = 5;

/// Sample count above which an upload is flagged as unusually large.
pub const WARN_SAMPLE_COUNT: usize = 1000;
/// Ortholog row count above which an upload is flagged as unusually large.
pub const WARN_ORTHOLOG_COUNT: usize = 10000;
/// Mean orthologs-per-sample below which coverage is flagged as sparse.
pub const WARN_MIN_MEAN_ORTHOLOGS: f64 = 5.0;

/// Failures at the upload-validation boundary. These are returned as values
/// (never panicked) so the presentation layer can render feedback directly.
#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("invalid file type: only .txt files are supported")]
    InvalidFileType,
    #[error("could not decode base64 content")]
    DecodeError,
    #[error("invalid format at line {line}: '{content}'; expected '>' for a sample ID or 'K' followed by digits for a KO entry")]
    InvalidFormat { line: usize, content: String },
    #[error("no valid sample or KO entries found in the file")]
    NoValidEntries,
    #[error("uploaded file exceeds the {} MB limit", MAX_UPLOAD_SIZE_MB)]
    SizeLimitExceeded
}

/// Non-fatal structural findings reported alongside a successful parse.
#[derive(Clone, Debug, PartialEq)]
pub enum UploadWarning {
    /// More samples than the interface is tuned for
    ManySamples { count: usize },
    /// More ortholog rows than the interface is tuned for
    ManyOrthologs { count: usize },
    /// Mean orthologs-per-sample is low enough to suggest a truncated upload
    SparseCoverage { mean: f64 }
}

impl std::fmt::Display for UploadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadWarning::ManySamples { count } => {
                write!(f, "upload contains {count} samples (more than {WARN_SAMPLE_COUNT})")
            },
            UploadWarning::ManyOrthologs { count } => {
                write!(f, "upload contains {count} ortholog entries (more than {WARN_ORTHOLOG_COUNT})")
            },
            UploadWarning::SparseCoverage { mean } => {
                write!(f, "mean orthologs per sample is {mean:.1} (less than {WARN_MIN_MEAN_ORTHOLOGS})")
            }
        }
    }
}

/// Validates and parses an uploaded annotation file into (sample, ko) records.
/// # Arguments
/// * `content` - the file content, possibly wrapped as `data:<mime>;base64,<payload>`
/// * `filename` - the uploaded filename, used only to check the extension
/// # Errors
/// * if the extension is not `.txt`, the wrapper does not decode, a line does
///   not match the grammar, or no records are produced
pub fn validate_and_process_input(content: &str, filename: &str) -> Result<Vec<AnnotationRecord>, ValidationError> {
    info!("Validating uploaded annotation file: {filename:?}");

    if !filename.to_lowercase().ends_with(".txt") {
        return Err(ValidationError::InvalidFileType);
    }

    let decoded = decode_content_if_base64(content)?;
    parse_content_lines(&decoded)
}

/// Strict companion to [`validate_and_process_input`]: additionally enforces
/// the upload size ceiling and reports non-fatal structural warnings.
/// # Arguments
/// * `content` - the file content, possibly base64-wrapped
/// * `filename` - the uploaded filename
/// # Errors
/// * everything [`validate_and_process_input`] raises, plus `SizeLimitExceeded`
pub fn process_upload(content: &str, filename: &str) -> Result<(Vec<AnnotationRecord>, Vec<UploadWarning>), ValidationError> {
    if content.len() > MAX_UPLOAD_SIZE_MB * 1024 * 1024 {
        return Err(ValidationError::SizeLimitExceeded);
    }

    let records = validate_and_process_input(content, filename)?;
    let warnings = structural_warnings(&records);
    for warning in warnings.iter() {
        warn!("Upload warning: {warning}");
    }
    Ok((records, warnings))
}

/// Reads an annotation file from disk and runs it through the strict validator.
/// # Arguments
/// * `path` - path to a plain-text annotation file
pub fn load_annotation_file(path: &Path) -> anyhow::Result<(Vec<AnnotationRecord>, Vec<UploadWarning>)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Error while reading annotation file {path:?}:"))?;
    let filename = path.file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_default();
    let parsed = process_upload(&content, &filename)
        .with_context(|| format!("Error while validating annotation file {path:?}:"))?;
    Ok(parsed)
}

/// Unwraps a `data:<mime>;base64,<payload>` transport wrapper when present.
/// Content without the wrapper is passed through unchanged.
fn decode_content_if_base64(content: &str) -> Result<String, ValidationError> {
    if !content.starts_with("data") {
        return Ok(content.to_string());
    }

    let (_, payload) = content.split_once(',').ok_or(ValidationError::DecodeError)?;
    let decoded_bytes = STANDARD.decode(payload).map_err(|_| ValidationError::DecodeError)?;
    String::from_utf8(decoded_bytes).map_err(|_| ValidationError::DecodeError)
}

/// Applies the line grammar: `>` opens a sample, `K` + digits appends a row,
/// blank lines are skipped, anything else is a hard error naming the line.
fn parse_content_lines(content: &str) -> Result<Vec<AnnotationRecord>, ValidationError> {
    let mut records: Vec<AnnotationRecord> = Vec::new();
    let mut current_sample: Option<String> = None;

    for (line_num, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('>') {
            let sample = rest.trim();
            if sample.is_empty() {
                return Err(ValidationError::InvalidFormat {
                    line: line_num + 1,
                    content: line.to_string()
                });
            }
            debug!("Sample opened at line {}: {sample}", line_num + 1);
            current_sample = Some(sample.to_string());
        } else if is_ko_entry(line) {
            match current_sample.as_ref() {
                Some(sample) => records.push(AnnotationRecord::new(sample, line)),
                None => {
                    // an ortholog line with no preceding sample is malformed input
                    return Err(ValidationError::InvalidFormat {
                        line: line_num + 1,
                        content: line.to_string()
                    });
                }
            }
        } else {
            return Err(ValidationError::InvalidFormat {
                line: line_num + 1,
                content: line.to_string()
            });
        }
    }

    if records.is_empty() {
        return Err(ValidationError::NoValidEntries);
    }

    info!("Parsed {} annotation records", records.len());
    Ok(records)
}

/// Matches the full-line KO pattern `K\d+`.
fn is_ko_entry(line: &str) -> bool {
    let mut chars = line.chars();
    chars.next() == Some('K') && {
        let rest = chars.as_str();
        !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())
    }
}

/// Computes the non-fatal structural warnings for a parsed upload.
fn structural_warnings(records: &[AnnotationRecord]) -> Vec<UploadWarning> {
    let mut warnings = Vec::new();

    let mut samples: Vec<&str> = records.iter().map(|r| r.sample.as_str()).collect();
    samples.sort_unstable();
    samples.dedup();
    let sample_count = samples.len();
    let ortholog_count = records.len();

    if sample_count > WARN_SAMPLE_COUNT {
        warnings.push(UploadWarning::ManySamples { count: sample_count });
    }
    if ortholog_count > WARN_ORTHOLOG_COUNT {
        warnings.push(UploadWarning::ManyOrthologs { count: ortholog_count });
    }

    let mean = ortholog_count as f64 / sample_count as f64;
    if mean < WARN_MIN_MEAN_ORTHOLOGS {
        warnings.push(UploadWarning::SparseCoverage { mean });
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_parse() {
        let content = ">S1\nK00001\nK00002\n>S2\nK00001\nK00003";
        let records = validate_and_process_input(content, "upload.txt").unwrap();
        assert_eq!(records, vec![
            AnnotationRecord::new("S1", "K00001"),
            AnnotationRecord::new("S1", "K00002"),
            AnnotationRecord::new("S2", "K00001"),
            AnnotationRecord::new("S2", "K00003")
        ]);
    }

    #[test]
    fn test_duplicates_preserved() {
        let content = ">S1\nK00001\nK00001\nK00001";
        let records = validate_and_process_input(content, "upload.txt").unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let content = ">S1\n\nK00001\n\n\nK00002\n";
        let records = validate_and_process_input(content, "upload.txt").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_invalid_file_type() {
        let result = validate_and_process_input(">S1\nK00001", "upload.csv");
        assert!(matches!(result, Err(ValidationError::InvalidFileType)));
    }

    #[test]
    fn test_invalid_line_is_reported_with_number() {
        let content = ">S1\nK00001\nnot-a-ko";
        let result = validate_and_process_input(content, "upload.txt");
        match result {
            Err(ValidationError::InvalidFormat { line, content }) => {
                assert_eq!(line, 3);
                assert_eq!(content, "not-a-ko");
            },
            other => panic!("expected InvalidFormat, got {other:?}")
        }
    }

    #[test]
    fn test_ko_before_any_sample_is_invalid() {
        let result = validate_and_process_input("K00001\n>S1", "upload.txt");
        assert!(matches!(result, Err(ValidationError::InvalidFormat { line: 1, .. })));
    }

    #[test]
    fn test_ko_must_be_full_line_match() {
        // trailing text disqualifies the KO line
        let result = validate_and_process_input(">S1\nK00001x", "upload.txt");
        assert!(matches!(result, Err(ValidationError::InvalidFormat { line: 2, .. })));
    }

    #[test]
    fn test_empty_sample_name_is_invalid() {
        let result = validate_and_process_input(">\nK00001", "upload.txt");
        assert!(matches!(result, Err(ValidationError::InvalidFormat { line: 1, .. })));
    }

    #[test]
    fn test_no_valid_entries() {
        let result = validate_and_process_input(">S1\n>S2", "upload.txt");
        assert!(matches!(result, Err(ValidationError::NoValidEntries)));
    }

    #[test]
    fn test_base64_wrapper_round_trip() {
        let plain = ">S1\nK00001\nK00002";
        let wrapped = format!("data:text/plain;base64,{}", STANDARD.encode(plain));
        let records = validate_and_process_input(&wrapped, "upload.txt").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_malformed_base64_wrapper() {
        let result = validate_and_process_input("data:text/plain;base64,!!!", "upload.txt");
        assert!(matches!(result, Err(ValidationError::DecodeError)));

        // wrapper prefix without a payload separator
        let result = validate_and_process_input("datajunk", "upload.txt");
        assert!(matches!(result, Err(ValidationError::DecodeError)));
    }

    #[test]
    fn test_size_limit() {
        let mut content = String::from(">S1\n");
        while content.len() <= MAX_UPLOAD_SIZE_MB * 1024 * 1024 {
            content.push_str("K00001\n");
        }
        let result = process_upload(&content, "upload.txt");
        assert!(matches!(result, Err(ValidationError::SizeLimitExceeded)));
    }

    #[test]
    fn test_sparse_coverage_warning() {
        let (records, warnings) = process_upload(">S1\nK00001\nK00002", "upload.txt").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(warnings, vec![UploadWarning::SparseCoverage { mean: 2.0 }]);
    }

    #[test]
    fn test_dense_upload_has_no_warnings() {
        let mut content = String::from(">S1\n");
        for i in 0..10 {
            content.push_str(&format!("K0000{i}\n"));
        }
        let (_, warnings) = process_upload(&content, "upload.txt").unwrap();
        assert!(warnings.is_empty());
    }
}
