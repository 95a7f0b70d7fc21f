use csv::{ReaderBuilder, Trim};
use tracing::debug;

use super::record::Record;
use super::settings::Settings;
use crate::error::ImportError;

/// Rows and discovered header of a CSV document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCsv {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

/// Result of importing a catalog: the records plus the settings that go
/// with them.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub catalog: Vec<Record>,
    pub columns: Vec<String>,
    pub settings: Settings,
}

/// Parse CSV text with a header row.
///
/// Blank lines are skipped and short rows are padded with empty strings, so
/// every row carries every discovered column. Header cells that are blank
/// do not become columns; a document with no usable header is rejected.
pub fn parse_csv(text: &str) -> Result<ParsedCsv, ImportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::None)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ImportError::ParseFailure(e.to_string()))?
        .clone();

    // (column index, name) for every usable header cell; first occurrence wins
    let mut indexed: Vec<(usize, String)> = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        if name.trim().is_empty() || indexed.iter().any(|(_, seen)| seen == name) {
            continue;
        }
        indexed.push((idx, name.to_string()));
    }

    if indexed.is_empty() {
        return Err(ImportError::NoHeaders);
    }

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let row = result.map_err(|e| {
            ImportError::ParseFailure(format!("row {}: {}", line + 1, e))
        })?;
        rows.push(
            indexed
                .iter()
                .map(|(idx, name)| (name.clone(), row.get(*idx).unwrap_or("").to_string()))
                .collect::<Record>(),
        );
    }

    let columns = indexed.into_iter().map(|(_, name)| name).collect();
    debug!("Parsed CSV with {} rows", rows.len());
    Ok(ParsedCsv { columns, rows })
}

/// Import a catalog from CSV text.
///
/// With no `existing` settings the first column becomes the key and every
/// column is saved. Existing settings are carried over where the new
/// columns allow it.
pub fn import_catalog(text: &str, existing: Option<&Settings>) -> Result<ImportOutcome, ImportError> {
    let parsed = parse_csv(text)?;
    let settings = match existing {
        Some(previous) => previous.reconciled_with(&parsed.columns),
        None => Settings::for_columns(&parsed.columns),
    };

    Ok(ImportOutcome {
        catalog: parsed.rows,
        columns: parsed.columns,
        settings,
    })
}
