//! Response export
//!
//! Projects stored responses to one row per `(response, answer)` pair and
//! renders them as CSV. Values use the same canonical keys as the summary.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;

use super::canonical::canonical_key;
use crate::storage::{ResponseCursor, ResponseStore, StorageError, StorageResult};

/// CSV header line
pub const CSV_HEADER: [&str; 3] = ["submittedAt", "fieldId", "value"];

/// One exported answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub submitted_at: DateTime<Utc>,
    pub field_id: String,
    pub value: String,
}

impl ExportRow {
    /// Render as a CSV record, newline included
    pub fn to_csv_record(&self) -> String {
        let submitted_at = self.submitted_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        csv_record(&[submitted_at.as_str(), self.field_id.as_str(), self.value.as_str()])
    }
}

/// Streaming projection over a response cursor.
///
/// By default a response that fails to read is skipped with a warning. A
/// strict projection stops at the first failure instead and keeps the error
/// for `take_error`.
pub struct ExportRows {
    cursor: ResponseCursor,
    pending: VecDeque<ExportRow>,
    strict: bool,
    error: Option<StorageError>,
}

impl ExportRows {
    pub fn new(cursor: ResponseCursor) -> Self {
        Self {
            cursor,
            pending: VecDeque::new(),
            strict: false,
            error: None,
        }
    }

    /// Projection that ends at the first unreadable response
    pub fn strict(cursor: ResponseCursor) -> Self {
        Self {
            strict: true,
            ..Self::new(cursor)
        }
    }

    /// Error that ended a strict projection early
    pub fn take_error(&mut self) -> Option<StorageError> {
        self.error.take()
    }
}

impl Iterator for ExportRows {
    type Item = ExportRow;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Some(row);
            }
            if self.error.is_some() {
                return None;
            }
            match self.cursor.next()? {
                Ok(response) => {
                    let submitted_at = response.submitted_at;
                    self.pending.extend(response.answers.into_iter().map(|answer| ExportRow {
                        submitted_at,
                        value: canonical_key(&answer.value),
                        field_id: answer.field_id,
                    }));
                }
                Err(e) if self.strict => {
                    self.error = Some(e);
                    return None;
                }
                Err(e) => warn!(error = %e, "skipping unreadable response during export"),
            }
        }
    }
}

/// Export rows for every stored response of `form_id`
pub fn export_rows(store: &dyn ResponseStore, form_id: &str) -> StorageResult<ExportRows> {
    Ok(ExportRows::new(store.find_by_form(form_id)?))
}

/// Export rows that fail on the first unreadable response
pub fn strict_export_rows(store: &dyn ResponseStore, form_id: &str) -> StorageResult<ExportRows> {
    Ok(ExportRows::strict(store.find_by_form(form_id)?))
}

/// CSV lines: header first, then one line per row
pub fn csv_lines<I>(rows: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = ExportRow>,
{
    std::iter::once(csv_record(&CSV_HEADER)).chain(rows.into_iter().map(|r| r.to_csv_record()))
}

/// Write a complete CSV document
pub fn write_csv<I, W>(rows: I, out: &mut W) -> io::Result<()>
where
    I: IntoIterator<Item = ExportRow>,
    W: Write,
{
    for line in csv_lines(rows) {
        out.write_all(line.as_bytes())?;
    }
    out.flush()
}

/// Write a CSV document from a projection, failing if it ended early
pub fn write_export<W: Write>(mut rows: ExportRows, out: &mut W) -> StorageResult<()> {
    write_csv(&mut rows, out).map_err(|e| StorageError::io("Failed to write export", e))?;
    match rows.take_error() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn csv_record(cells: &[&str]) -> String {
    let mut line = cells
        .iter()
        .map(|c| escape_cell(c))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

/// Quote a cell when it holds a separator, quote, line break, or leading space
fn escape_cell(cell: &str) -> Cow<'_, str> {
    let needs_quotes = cell.contains(&[',', '"', '\r', '\n'][..])
        || cell.starts_with(' ')
        || cell.starts_with('\t');
    if needs_quotes {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}
