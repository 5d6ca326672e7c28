//! Tabular file parsing
//!
//! Converts an uploaded file into a [`RowSet`]. The two recognized formats
//! are delimited text (.csv) and spreadsheet binary (.xlsx); anything else
//! is rejected by extension before any row content is read.

use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};

use super::{Row, RowSet};
use crate::error::{OpsError, Result};

/// A recognized tabular upload format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularFormat {
    Csv,
    Xlsx,
}

impl TabularFormat {
    /// Classify a file by extension
    ///
    /// Returns:
    /// - `Ok(format)` — recognized extension (case-insensitive)
    /// - `Err(UnsupportedFormat)` — anything else, including no extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(TabularFormat::Csv),
            "xlsx" => Ok(TabularFormat::Xlsx),
            _ => Err(OpsError::UnsupportedFormat { extension }),
        }
    }
}

/// Parse a file into a row set, dispatching on its format
pub fn parse_file(path: &Path) -> Result<RowSet> {
    match TabularFormat::from_path(path)? {
        TabularFormat::Csv => parse_csv(path),
        TabularFormat::Xlsx => parse_xlsx(path),
    }
}

// =============================================================================
// Delimited Text
// =============================================================================

fn parse_csv(path: &Path) -> Result<RowSet> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| OpsError::Parse(e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| OpsError::Parse(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| OpsError::Parse(e.to_string()))?;
        let cells = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), record.get(i).unwrap_or_default().to_string()))
            .collect();
        rows.push(Row::new(cells));
    }

    Ok(RowSet { headers, rows })
}

// =============================================================================
// Spreadsheet
// =============================================================================

fn parse_xlsx(path: &Path) -> Result<RowSet> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e: calamine::XlsxError| OpsError::Parse(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| OpsError::Parse("workbook has no sheets".to_string()))?
        .map_err(|e| OpsError::Parse(e.to_string()))?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header_row) => header_row.iter().map(cell_to_string).collect(),
        None => return Ok(RowSet::default()),
    };

    let mut rows = Vec::new();
    for sheet_row in sheet_rows {
        let cells: Vec<(String, String)> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let value = sheet_row.get(i).map(cell_to_string).unwrap_or_default();
                (header.clone(), value)
            })
            .collect();

        // Spreadsheets routinely carry trailing blank rows; skip them
        if cells.iter().all(|(_, value)| value.is_empty()) {
            continue;
        }
        rows.push(Row::new(cells));
    }

    Ok(RowSet { headers, rows })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}
