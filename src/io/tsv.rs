use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::common::{reader, Compression};
use crate::error::CodecError;
use crate::points::PointStore;

const CONTEXT: &str = "io::tsv";

/// Column type of a raw TSV source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Float,
    Integer,
}

impl FromStr for FieldType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "float" => Ok(Self::Float),
            "integer" => Ok(Self::Integer),
            other => Err(CodecError::format(CONTEXT, format!("unknown field type {other:?}"))),
        }
    }
}

impl FieldType {
    fn parse(self, cell: &str) -> Option<f64> {
        let cell = cell.trim();
        match self {
            Self::Float => cell.parse::<f64>().ok(),
            Self::Integer => cell.parse::<i64>().ok().map(|i| i as f64),
        }
    }
}

/// Stream a tab-separated file row by row, decompressing `.gz`/`.br` by extension.
///
/// Each non-empty line must have at least `fields.len()` cells; the parsed leading cells are
/// handed to `on_row`, further cells are ignored. Returns the number of rows read.
pub fn read_tsv<F>(path: &Path, fields: &[FieldType], mut on_row: F) -> Result<usize>
where
    F: FnMut(&[f64]) -> Result<()>,
{
    let file = File::open(path)
        .with_context(|| format!("[io::tsv] Failed to open {}", path.display()))?;
    let lines = BufReader::new(reader(file, Compression::from_path(path))).lines();

    let mut row = Vec::with_capacity(fields.len());
    let mut rows = 0;
    for (number, line) in lines.enumerate() {
        let line = line.with_context(|| format!("[io::tsv] Failed to read {} at line {}", path.display(), number + 1))?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() { continue }

        row.clear();
        let mut cells = line.split('\t');
        for (column, field) in fields.iter().enumerate() {
            let Some(cell) = cells.next() else {
                bail!(CodecError::format(CONTEXT, format!(
                    "{} line {}: expected {} columns, found {}", path.display(), number + 1, fields.len(), column
                )));
            };
            let Some(value) = field.parse(cell) else {
                bail!(CodecError::format(CONTEXT, format!(
                    "{} line {} column {}: {cell:?} is not a valid {field:?}", path.display(), number + 1, column + 1
                )));
            };
            row.push(value);
        }
        on_row(&row)?;
        rows += 1;
    }
    Ok(rows)
}

/// Read `x\ty[\tv]` rows into a point store; unweighted rows get weight 1.
pub fn read_points(path: &Path, weighted: bool) -> Result<PointStore> {
    let fields: &[FieldType] = if weighted {
        &[FieldType::Float, FieldType::Float, FieldType::Float]
    } else {
        &[FieldType::Float, FieldType::Float]
    };
    let mut store = PointStore::new();
    read_tsv(path, fields, |row| {
        store.add(row[0], row[1], row.get(2).copied().unwrap_or(1.0)).map(|_| ())
    })?;
    log::info!("[io::tsv] read {} points from {}", store.len(), path.display());
    Ok(store)
}
