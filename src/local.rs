use csv::ReaderBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::C2gError;

/// A local CSV file scheduled for conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCsvEntry {
    /// File name without extension; the name of the resulting Google Sheets file.
    pub name: String,
    pub basename: String,
    pub full_path: PathBuf,
    pub matched_remote_id: Option<String>,
}

impl LocalCsvEntry {
    pub fn from_path(full_path: PathBuf) -> Self {
        let basename = full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = full_path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| basename.clone());
        Self {
            name,
            basename,
            full_path,
            matched_remote_id: None,
        }
    }
}

/// Row count and widest row of a CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvShape {
    pub rows: usize,
    pub columns: usize,
}

fn has_csv_extension(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".csv")
}

/// Resolve `source_dir` to the CSV files it designates. A path ending in
/// `.csv` is returned as is; otherwise the immediate children of the
/// directory are filtered in listing order.
pub fn list_local_csv_files(source_dir: &Path) -> Result<Vec<PathBuf>, C2gError> {
    if has_csv_extension(&source_dir.to_string_lossy()) {
        debug!("Source is a single CSV file: {}", source_dir.display());
        return Ok(vec![source_dir.to_path_buf()]);
    }

    let read_error = |source| C2gError::DirectoryRead {
        path: source_dir.to_path_buf(),
        source,
    };
    let mut csv_files = Vec::new();
    for entry in fs::read_dir(source_dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        if has_csv_extension(&entry.file_name().to_string_lossy()) {
            csv_files.push(source_dir.join(entry.file_name()));
        }
    }

    info!(
        "Found {} CSV files in {}",
        csv_files.len(),
        source_dir.display()
    );
    Ok(csv_files)
}

pub fn csv_shape(path: &Path) -> Result<CsvShape, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut shape = CsvShape {
        rows: 0,
        columns: 0,
    };
    for record in reader.byte_records() {
        let record = record?;
        shape.rows += 1;
        shape.columns = shape.columns.max(record.len());
    }
    Ok(shape)
}
