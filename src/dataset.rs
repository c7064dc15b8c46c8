//! Tabular dataset files.
//!
//! Reading and writing the extraction file and the master dataset. Every
//! write renders the whole file in memory and replaces the target in one
//! call, so a failed stage never leaves a half-written file behind.

use crate::error::PipelineError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Lenient numeric deserializers for CSV columns.
///
/// Empty, non-numeric, and non-finite values become `None`.
pub mod lenient {
    use serde::{Deserialize, Deserializer};

    pub fn parse_float(raw: &str) -> Option<f64> {
        raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Integers are accepted in decimal notation too ("150.0" is 150).
    pub fn parse_int(raw: &str) -> Option<i64> {
        parse_float(raw).map(|v| v.trunc() as i64)
    }

    pub fn float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_float))
    }

    pub fn int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_int))
    }
}

/// Read every row of a CSV file with a header.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()?;

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Render rows as CSV text, header first.
pub fn to_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>, PipelineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| PipelineError::Io(std::io::Error::new(ErrorKind::Other, e.to_string())))
}

/// Overwrite `path` with the rows as CSV.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), PipelineError> {
    let content = to_csv(rows)?;
    write_file(path, &content)?;
    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Overwrite `path` with `content`, creating parent directories.
///
/// A permission failure is reported as a locked output so the operator can
/// close whatever holds the file and re-run.
pub fn write_file(path: &Path, content: &[u8]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(path, content).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => PipelineError::OutputLocked(path.to_path_buf()),
        _ => PipelineError::Io(e),
    })
}

/// Read a whole text file, failing with `InputNotFound` when it is absent.
pub fn read_text(path: &Path) -> Result<String, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DatasetRow;
    use tempfile::TempDir;

    #[test]
    fn test_lenient_parsing() {
        assert_eq!(lenient::parse_float("0.42"), Some(0.42));
        assert_eq!(lenient::parse_float(" 1e-2 "), Some(0.01));
        assert_eq!(lenient::parse_float("NaN"), None);
        assert_eq!(lenient::parse_float("inf"), None);
        assert_eq!(lenient::parse_float("n/a"), None);
        assert_eq!(lenient::parse_int("150.0"), Some(150));
        assert_eq!(lenient::parse_int("-3"), Some(-3));
        assert_eq!(lenient::parse_int(""), None);
    }

    #[test]
    fn test_read_rows_with_garbage_numbers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extracted.csv");
        std::fs::write(
            &path,
            "pmid,title,population_size,epigenetic_effect_size,proportion_positive\n\
             1,A,abc,0.25,\n\
             2,B,120.0,oops,0.4\n",
        )
        .unwrap();

        let rows: Vec<DatasetRow> = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].population_size, None);
        assert_eq!(rows[0].epigenetic_effect_size, Some(0.25));
        assert_eq!(rows[0].proportion_positive, None);
        assert_eq!(rows[1].population_size, Some(120));
        assert_eq!(rows[1].epigenetic_effect_size, None);
        assert_eq!(rows[1].proportion_positive, Some(0.4));
        // Columns missing from the file fall back to defaults.
        assert_eq!(rows[1].country, "");
    }

    #[test]
    fn test_missing_input_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.csv");
        let err = read_rows::<DatasetRow>(&path).unwrap_err();
        assert!(matches!(err, PipelineError::InputNotFound(p) if p == path));
    }

    #[test]
    fn test_write_creates_parent_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.csv");

        let first = vec![DatasetRow {
            pmid: "1".to_string(),
            ..DatasetRow::default()
        }];
        write_rows(&path, &first).unwrap();

        let second = vec![
            DatasetRow {
                pmid: "7".to_string(),
                ..DatasetRow::default()
            },
            DatasetRow {
                pmid: "8".to_string(),
                ..DatasetRow::default()
            },
        ];
        write_rows(&path, &second).unwrap();

        let rows: Vec<DatasetRow> = read_rows(&path).unwrap();
        let pmids: Vec<_> = rows.iter().map(|r| r.pmid.as_str()).collect();
        assert_eq!(pmids, vec!["7", "8"]);
    }
}
