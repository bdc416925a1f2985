//! CSV loading for the credit-default table

use super::Dataset;
use crate::error::{CreditError, Result};
use polars::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Loads delimited files into polars frames
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows scanned to infer the schema (None = whole file)
    infer_schema_length: Option<usize>,
    delimiter: u8,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(1000),
            delimiter: b',',
        }
    }

    /// Set how many rows are scanned for schema inference
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Load a headered CSV file
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<DataFrame> {
        let file = File::open(path.as_ref())?;

        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| CreditError::DataError(format!("{}: {}", path.as_ref().display(), e)))
    }

    /// Drop the named columns. Every name must exist.
    pub fn drop_columns(df: DataFrame, columns: &[String]) -> Result<DataFrame> {
        columns.iter().try_fold(df, |frame, name| {
            frame
                .drop(name)
                .map_err(|_| CreditError::FeatureNotFound(name.clone()))
        })
    }

    /// Load the CSV at `path` and remove `dropped` columns
    pub fn load_dataset<P: AsRef<Path>>(&self, path: P, dropped: &[String]) -> Result<Dataset> {
        let path = path.as_ref();
        if let Ok(info) = self.file_info(path) {
            debug!(path = %path.display(), rows = info.n_rows, cols = info.n_cols, bytes = info.file_size, "Reading CSV");
        }

        let df = self.load_csv(path)?;
        let df = Self::drop_columns(df, dropped)?;
        Ok(Dataset::new(df))
    }

    /// Get file info without loading full data
    pub fn file_info<P: AsRef<Path>>(&self, path: P) -> Result<FileInfo> {
        let path = path.as_ref();
        let file_size = std::fs::metadata(path)?.len();

        let reader = BufReader::new(File::open(path)?);
        let mut lines = reader.lines();

        let header = lines.next().transpose()?.unwrap_or_default();
        let columns: Vec<String> = header
            .split(self.delimiter as char)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let n_rows = lines.filter(|l| l.as_ref().map(|s| !s.trim().is_empty()).unwrap_or(false)).count();

        Ok(FileInfo {
            path: path.display().to_string(),
            file_size,
            n_rows,
            n_cols: columns.len(),
            columns,
        })
    }
}

/// File information
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: String,
    pub file_size: u64,
    pub n_rows: usize,
    pub n_cols: usize,
    pub columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("data.csv");
        let mut f = File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_csv_and_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "SEX,EDU,AGE,PAY\n1,2,30,0\n2,1,45,1\n");

        let ds = DataLoader::new()
            .load_dataset(&path, &["SEX".to_string(), "EDU".to_string()])
            .unwrap();

        assert_eq!(ds.height(), 2);
        assert_eq!(ds.column_names(), vec!["AGE".to_string(), "PAY".to_string()]);
    }

    #[test]
    fn test_drop_missing_column_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "AGE,PAY\n30,0\n");

        let err = DataLoader::new()
            .load_dataset(&path, &["SEX".to_string()])
            .unwrap_err();
        assert!(matches!(err, CreditError::FeatureNotFound(ref c) if c == "SEX"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = DataLoader::new().load_csv("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, CreditError::IoError(_)));
    }

    #[test]
    fn test_file_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "a,b,c\n1,2,3\n4,5,6\n7,8,9\n");

        let info = DataLoader::new().file_info(&path).unwrap();
        assert_eq!(info.n_rows, 3);
        assert_eq!(info.n_cols, 3);
        assert_eq!(info.columns, vec!["a", "b", "c"]);
    }
}
