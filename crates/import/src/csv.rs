use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use thiserror::Error;

use crate::row::RawRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvUploadOptions {
    pub delimiter: String,
}

impl Default for CsvUploadOptions {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
        }
    }
}

/// A parsed upload: the header set, fixed for the session, and one raw row
/// per data line.
#[derive(Debug, Clone, Default)]
pub struct UploadedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl UploadedCsv {
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Missing header row")]
    MissingHeader,
    #[error("Duplicate column name: {0}")]
    DuplicateHeader(String),
}

pub fn parse_upload<R: Read>(data: R, options: &CsvUploadOptions) -> Result<UploadedCsv, CsvError> {
    let delimiter = options
        .delimiter
        .as_bytes()
        .first()
        .copied()
        .unwrap_or(b',');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(data);

    let headers = read_headers(&mut reader)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        // Short records get empty cells, extra trailing fields are dropped.
        let row: RawRow = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), record.get(i).unwrap_or_default().to_string()))
            .collect();
        rows.push(row);
    }

    tracing::debug!("Parsed CSV upload: {} columns, {} rows", headers.len(), rows.len());

    Ok(UploadedCsv { headers, rows })
}

fn read_headers<R: Read>(reader: &mut csv::Reader<R>) -> Result<Vec<String>, CsvError> {
    let record = reader.headers()?;
    let headers: Vec<String> = record
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::MissingHeader);
    }

    let mut seen = HashSet::new();
    for h in &headers {
        if !seen.insert(h.as_str()) {
            return Err(CsvError::DuplicateHeader(h.clone()));
        }
    }

    Ok(headers)
}
