//! Conversion matrices between two region collections.
//!
//! A run goes through four stages: streaming points through both region indexes, aggregating
//! per-region totals, reconciling (noise threshold, overlap fallback for unhit source regions,
//! target gap detection) and emitting rows sorted by source and target index.

mod builder;
mod entry;
mod report;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::common::ensure_parent_exists;

pub use builder::{error_estimate, MatrixBuilder};
pub use entry::{MatrixEntry, Method};
pub use report::{MatrixReport, MissedPoint, SourceDeviation, FRACTION_SUM_TOLERANCE};

/// Rows of a finished run together with its report.
#[derive(Debug, Clone)]
pub struct ConversionMatrix {
    /// Key property of the source regions.
    pub key1: String,
    /// Key property of the target regions.
    pub key2: String,
    pub entries: Vec<MatrixEntry>,
    pub report: MatrixReport,
}

impl ConversionMatrix {
    /// Header line matching `MatrixEntry::to_tsv_row` with the same flags.
    pub fn tsv_header(&self, with_error: bool, with_method: bool) -> String {
        let mut header = format!("key1_{}\tkey2_{}\tfraction\tresidents", self.key1, self.key2);
        if with_error { header.push_str("\terror") }
        if with_method { header.push_str("\tmethod") }
        header
    }

    /// Render the whole matrix as TSV, one line per row.
    pub fn to_tsv_string(&self, with_error: bool, with_method: bool) -> String {
        let mut out = self.tsv_header(with_error, with_method);
        out.push('\n');
        for entry in &self.entries {
            out.push_str(&entry.to_tsv_row(with_error, with_method));
            out.push('\n');
        }
        out
    }

    /// Write the matrix as TSV to `path`.
    pub fn write_tsv(&self, path: &Path, with_error: bool, with_method: bool) -> Result<()> {
        ensure_parent_exists(path)?;
        let file = File::create(path)
            .with_context(|| format!("[matrix] Failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        writeln!(out, "{}", self.tsv_header(with_error, with_method))?;
        for entry in &self.entries {
            writeln!(out, "{}", entry.to_tsv_row(with_error, with_method))?;
        }
        out.flush()
            .with_context(|| format!("[matrix] Failed to write {}", path.display()))?;
        log::info!("[matrix] wrote {} rows to {}", self.entries.len(), path.display());
        Ok(())
    }

    /// Rows belonging to source region `source`.
    pub fn rows_for_source(&self, source: usize) -> impl Iterator<Item = &MatrixEntry> + '_ {
        self.entries.iter().filter(move |e| e.source == source)
    }
}
