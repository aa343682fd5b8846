//! CSV export of extracted records.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, instrument};

use crate::directory::Record;
use crate::error::ScrapeError;

/// Default column labels, in export order.
pub const DEFAULT_COLUMNS: [&str; 9] = [
    "Name",
    "House",
    "Year",
    "Concentration",
    "Assigned House",
    "Dorm Address",
    "Mail Address",
    "Email",
    "Photo",
];

/// Ordered column labels. A label maps to the record field named by its
/// lowercase form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpec {
    columns: Vec<String>,
}

impl Default for ExportSpec {
    fn default() -> Self {
        Self::new(DEFAULT_COLUMNS)
    }
}

impl ExportSpec {
    /// Builds a spec from labels, kept exactly as given for the header row.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a comma-separated label list, trimming blanks.
    #[must_use]
    pub fn parse_list(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|label| !label.is_empty()),
        )
    }

    /// Header labels.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true when no column is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Cells for one record: one per column, empty when the field is absent
    /// or the label names no field.
    #[must_use]
    pub fn row<'r>(&self, record: &'r Record) -> Vec<&'r str> {
        self.columns
            .iter()
            .map(|label| record.get(&label.to_lowercase()).unwrap_or(""))
            .collect()
    }
}

/// Writes records as CSV in [`ExportSpec`] column order.
#[derive(Debug, Clone, Default)]
pub struct ResultExporter {
    spec: ExportSpec,
}

impl ResultExporter {
    /// Creates an exporter; `None` selects the default columns.
    #[must_use]
    pub fn new(spec: Option<ExportSpec>) -> Self {
        Self {
            spec: spec.unwrap_or_default(),
        }
    }

    /// The columns this exporter writes.
    #[must_use]
    pub fn spec(&self) -> &ExportSpec {
        &self.spec
    }

    /// Writes header and rows to `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::InvalidInput`] when no column is configured,
    /// otherwise the underlying IO error on write failure.
    pub fn write_to<W: Write>(&self, writer: W, records: &[Record]) -> io::Result<()> {
        self.check_columns()?;
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(self.spec.columns())
            .map_err(io::Error::from)?;
        for record in records {
            csv.write_record(self.spec.row(record))
                .map_err(io::Error::from)?;
        }
        csv.flush()
    }

    fn check_columns(&self) -> io::Result<()> {
        if self.spec.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "export needs at least one column",
            ));
        }
        Ok(())
    }

    /// Creates (or truncates) `path` and writes the export to it.
    ///
    /// An empty column list is rejected before the file is touched.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Io`] carrying the path and the unmodified IO
    /// error when the file cannot be created or written.
    #[instrument(skip(self, records), fields(path = %path.display(), records = records.len()))]
    pub fn write_path(&self, path: &Path, records: &[Record]) -> Result<(), ScrapeError> {
        self.check_columns()
            .map_err(|source| ScrapeError::io(path, source))?;
        let file = File::create(path).map_err(|source| ScrapeError::io(path, source))?;
        self.write_to(io::BufWriter::new(file), records)
            .map_err(|source| ScrapeError::io(path, source))?;
        debug!(columns = self.spec.len(), "export written");
        Ok(())
    }
}
