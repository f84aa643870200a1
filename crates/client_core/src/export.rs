use std::{collections::BTreeSet, fs::File, io, path::Path};

use serde::Serialize;
use shared::domain::{UserId, UserRecord};
use thiserror::Error;
use tracing::info;

use crate::{list_controller::ListController, view::display_timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Role")]
    pub role: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Created At")]
    pub created_at: String,
}

impl From<&UserRecord> for ExportRow {
    fn from(record: &UserRecord) -> Self {
        Self {
            name: record.name.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            role: record.role.label().to_string(),
            status: record.status.label().to_string(),
            created_at: display_timestamp(&record.created_at),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Please select at least one user on this page to export.")]
    NothingSelected,
    #[error("failed to write spreadsheet: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write spreadsheet: {0}")]
    Io(#[from] io::Error),
}

/// Destination for exported rows.
pub trait SpreadsheetWriter {
    fn write_rows(&mut self, rows: &[ExportRow]) -> Result<(), ExportError>;
}

pub struct CsvSpreadsheet<W: io::Write> {
    writer: csv::Writer<W>,
}

impl<W: io::Write> CsvSpreadsheet<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
        }
    }

    pub fn into_inner(self) -> Result<W, ExportError> {
        self.writer
            .into_inner()
            .map_err(|err| ExportError::Io(err.into_error()))
    }
}

impl CsvSpreadsheet<File> {
    pub fn create(path: &Path) -> Result<Self, ExportError> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: io::Write> SpreadsheetWriter for CsvSpreadsheet<W> {
    fn write_rows(&mut self, rows: &[ExportRow]) -> Result<(), ExportError> {
        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Rows for the selected users that are on the loaded page, in page order.
pub fn selected_rows(
    selection: &BTreeSet<UserId>,
    records: &[UserRecord],
) -> Result<Vec<ExportRow>, ExportError> {
    let rows: Vec<ExportRow> = records
        .iter()
        .filter(|record| selection.contains(&record.id))
        .map(ExportRow::from)
        .collect();
    if rows.is_empty() {
        return Err(ExportError::NothingSelected);
    }
    Ok(rows)
}

/// Writes the selected rows of the current page; nothing is written when the
/// selection does not intersect the page.
pub fn export_selection(
    list: &ListController,
    writer: &mut dyn SpreadsheetWriter,
) -> Result<usize, ExportError> {
    let rows = selected_rows(list.selection(), list.records())?;
    writer.write_rows(&rows)?;
    info!(rows = rows.len(), "exported selected users");
    Ok(rows.len())
}
