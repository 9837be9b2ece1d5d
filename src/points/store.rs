use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::common::{decompress, ensure_parent_exists, write_compressed, Compression};
use crate::config::Quantization;
use crate::error::CodecError;

use super::codec;

/// Default upper bound on the number of points held in one store.
pub const DEFAULT_POINT_LIMIT: usize = 22_200_000;

/// A weighted location: lon/lat plus a (possibly fractional) resident count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub v: f64,
}

impl Point {
    #[inline] pub fn new(x: f64, y: f64, v: f64) -> Self { Self { x, y, v } }
}

/// Columnar arena of points: three parallel columns with an explicit length limit.
#[derive(Debug, Clone)]
pub struct PointStore {
    xs: Vec<f64>,
    ys: Vec<f64>,
    vs: Vec<f64>,
    limit: usize,
}

impl Default for PointStore {
    fn default() -> Self { Self::new() }
}

impl PointStore {
    /// Empty store bounded by `DEFAULT_POINT_LIMIT`.
    pub fn new() -> Self { Self::with_limit(DEFAULT_POINT_LIMIT) }

    /// Empty store that refuses to grow beyond `limit` points.
    pub fn with_limit(limit: usize) -> Self {
        Self { xs: Vec::new(), ys: Vec::new(), vs: Vec::new(), limit }
    }

    /// Build a store from already decoded columns.
    pub fn from_columns(xs: Vec<f64>, ys: Vec<f64>, vs: Vec<f64>) -> Result<Self> {
        if xs.len() != ys.len() || xs.len() != vs.len() {
            bail!(CodecError::format("points::store", format!(
                "column lengths differ: x={}, y={}, v={}", xs.len(), ys.len(), vs.len()
            )));
        }
        let limit = DEFAULT_POINT_LIMIT.max(xs.len());
        Ok(Self { xs, ys, vs, limit })
    }

    /// Number of points.
    #[inline] pub fn len(&self) -> usize { self.xs.len() }

    /// Check if there are no points.
    #[inline] pub fn is_empty(&self) -> bool { self.xs.is_empty() }

    /// Maximum number of points this store accepts.
    #[inline] pub fn limit(&self) -> usize { self.limit }

    #[inline] pub fn xs(&self) -> &[f64] { &self.xs }
    #[inline] pub fn ys(&self) -> &[f64] { &self.ys }
    #[inline] pub fn vs(&self) -> &[f64] { &self.vs }

    /// Append a point and return its index.
    pub fn add(&mut self, x: f64, y: f64, v: f64) -> Result<usize> {
        if self.xs.len() >= self.limit {
            bail!(CodecError::CapacityExceeded { limit: self.limit });
        }
        self.xs.push(x);
        self.ys.push(y);
        self.vs.push(v);
        Ok(self.xs.len() - 1)
    }

    /// Get the point at `i`.
    #[inline]
    pub fn get(&self, i: usize) -> Option<Point> {
        (i < self.len()).then(|| Point::new(self.xs[i], self.ys[i], self.vs[i]))
    }

    /// Add `v` to the weight of point `i`.
    #[inline]
    pub fn inc(&mut self, i: usize, v: f64) { self.vs[i] += v }

    /// Sum of all weights.
    pub fn total_weight(&self) -> f64 { self.vs.iter().sum() }

    /// Iterator over all points in order.
    pub fn iter(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.len()).map(move |i| Point::new(self.xs[i], self.ys[i], self.vs[i]))
    }

    /// Iterator over consecutive batches of at most `size` points.
    pub fn chunks(&self, size: usize) -> impl Iterator<Item = PointChunk<'_>> + '_ {
        let size = size.max(1);
        (0..self.len()).step_by(size).map(move |start| {
            let end = (start + size).min(self.len());
            PointChunk {
                offset: start,
                xs: &self.xs[start..end],
                ys: &self.ys[start..end],
                vs: &self.vs[start..end],
            }
        })
    }

    /// Append every point of `other` accepted by `keep`; returns how many were added.
    pub fn extend_filtered(&mut self, other: &PointStore, mut keep: impl FnMut(&Point) -> bool) -> Result<usize> {
        let mut added = 0;
        for p in other.iter().filter(|p| keep(p)) {
            self.add(p.x, p.y, p.v)?;
            added += 1;
        }
        Ok(added)
    }

    /// Quantize, sort, consolidate and write the store to `path`.
    /// `.br` files are brotli-compressed, everything else gzip.
    pub fn save(&self, path: &Path, quantization: &Quantization) -> Result<usize> {
        let (raw, count) = codec::encode(self, quantization)
            .with_context(|| format!("[points::store] Failed to encode {}", path.display()))?;
        let compression = match Compression::from_path(path) {
            Compression::Brotli => Compression::Brotli,
            _ => Compression::GZip,
        };
        write_compressed(path, &raw, compression)?;
        log::info!("[points::store] wrote {} of {} points to {}", count, self.len(), path.display());
        Ok(count)
    }

    /// Read a point file written by `save`.
    pub fn load(path: &Path, quantization: &Quantization) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("[points::store] Failed to read {}", path.display()))?;
        let raw = decompress(&bytes, Compression::sniff(&bytes))
            .with_context(|| format!("[points::store] Failed to decompress {}", path.display()))?;
        let store = codec::decode(&raw, quantization)
            .with_context(|| format!("[points::store] Failed to decode {}", path.display()))?;
        log::info!("[points::store] loaded {} points from {}", store.len(), path.display());
        Ok(store)
    }

    /// Write one `x\ty\tv` line per point.
    pub fn export_tsv(&self, path: &Path) -> Result<()> {
        ensure_parent_exists(path)?;
        let file = File::create(path)
            .with_context(|| format!("[points::store] Failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        for p in self.iter() {
            writeln!(out, "{}\t{}\t{}", p.x, p.y, p.v)?;
        }
        out.flush()
            .with_context(|| format!("[points::store] Failed to write {}", path.display()))
    }
}

/// A borrowed batch of consecutive points.
#[derive(Debug, Clone, Copy)]
pub struct PointChunk<'a> {
    /// Index of the first point of this batch in the store.
    pub offset: usize,
    pub xs: &'a [f64],
    pub ys: &'a [f64],
    pub vs: &'a [f64],
}

impl<'a> PointChunk<'a> {
    #[inline] pub fn len(&self) -> usize { self.xs.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.xs.is_empty() }

    pub fn iter(self) -> impl Iterator<Item = Point> + 'a {
        let (xs, ys, vs) = (self.xs, self.ys, self.vs);
        (0..xs.len()).map(move |i| Point::new(xs[i], ys[i], vs[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_get() {
        let mut store = PointStore::new();
        assert_eq!(store.add(13.4, 52.5, 3.0).unwrap(), 0);
        assert_eq!(store.add(13.5, 52.6, 1.5).unwrap(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1), Some(Point::new(13.5, 52.6, 1.5)));
        assert_eq!(store.get(2), None);
        store.inc(0, 2.0);
        assert_eq!(store.total_weight(), 6.5);
    }

    #[test]
    fn limit_is_enforced() {
        let mut store = PointStore::with_limit(1);
        store.add(0.0, 0.0, 1.0).unwrap();
        let err = store.add(0.0, 0.0, 1.0).unwrap_err();
        assert_eq!(err.downcast_ref::<CodecError>(), Some(&CodecError::CapacityExceeded { limit: 1 }));
    }

    #[test]
    fn chunks_cover_every_point_once() {
        let mut store = PointStore::new();
        for i in 0..25 { store.add(i as f64, 0.0, 1.0).unwrap(); }
        let chunks = store.chunks(10).collect::<Vec<_>>();
        assert_eq!(chunks.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![10, 10, 5]);
        assert_eq!(chunks[2].offset, 20);
        let xs = chunks.iter().flat_map(|c| c.iter()).map(|p| p.x).collect::<Vec<_>>();
        assert_eq!(xs, (0..25).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        let err = PointStore::from_columns(vec![1.0], vec![], vec![1.0]).unwrap_err();
        assert!(matches!(err.downcast_ref::<CodecError>(), Some(CodecError::Format { .. })));
    }

    #[test]
    fn export_tsv_writes_one_line_per_point() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.tsv");
        let mut store = PointStore::new();
        store.add(1.5, 2.5, 3.0).unwrap();
        store.add(4.0, 5.0, 0.5).unwrap();
        store.export_tsv(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1.5\t2.5\t3\n4\t5\t0.5\n");
    }
}
