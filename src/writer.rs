//! Append-mode CSV output for the collector.

use crate::error::Result;
use crate::record::{ArticleRecord, CSV_HEADER};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes article records to one CSV file across a whole crawl.
///
/// The header goes out exactly once: an existing non-empty file is assumed
/// to carry it already; otherwise the first write creates the file with it.
/// The file is opened and closed on every [`append`](Self::append), so a
/// crashed run leaves everything written so far on disk.
#[derive(Debug)]
pub struct ArticleWriter {
    path: PathBuf,
    header_written: bool,
}

impl ArticleWriter {
    /// Create a writer for `path`, inspecting the file once.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let header_written = std::fs::metadata(&path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);

        if header_written {
            info!(path = %path.display(), "Appending to existing output file");
        }

        Self { path, header_written }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    /// Append records, writing the header first if this is a fresh file.
    ///
    /// Returns the number of rows written. An empty slice touches nothing.
    pub fn append(&mut self, records: &[ArticleRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let fresh = !self.header_written;
        let file = if fresh {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.path)?
        } else {
            OpenOptions::new().append(true).create(true).open(&self.path)?
        };

        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if fresh {
            wtr.write_record(CSV_HEADER)?;
        }
        for record in records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;

        self.header_written = true;
        debug!(path = %self.path.display(), rows = records.len(), "Appended records");
        Ok(records.len())
    }
}
