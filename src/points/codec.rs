//! Quantized, Hilbert-sorted, consolidated column encoding of point stores.
//!
//! Layout of the (uncompressed) buffer for `n` points, all little endian:
//! `n × u32` quantized x, then `n × u32` quantized y, then `n × u16` quantized weight.

use anyhow::{bail, Result};

use crate::config::Quantization;
use crate::error::CodecError;

use super::hilbert::hilbert_order;
use super::PointStore;

/// Bytes per encoded point (two u32 coordinates + one u16 weight).
pub const BYTES_PER_POINT: usize = 10;

/// Points in their on-disk fixed-point form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuantizedPoints {
    pub xs: Vec<u32>,
    pub ys: Vec<u32>,
    pub vs: Vec<u16>,
}

impl QuantizedPoints {
    #[inline] pub fn len(&self) -> usize { self.xs.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.xs.is_empty() }

    /// Quantize every point of `store`. Fails on the first point outside the configured bounds.
    pub fn from_store(store: &PointStore, q: &Quantization) -> Result<Self> {
        q.validate()?;
        let [x0, y0, x1, y1] = q.bbox;
        let (x_scale, y_scale, max) = (q.x_scale(), q.y_scale(), q.max_coord());

        let mut out = Self {
            xs: Vec::with_capacity(store.len()),
            ys: Vec::with_capacity(store.len()),
            vs: Vec::with_capacity(store.len()),
        };
        for p in store.iter() {
            out.xs.push(quantize_coord("x", p.x, x0, x1, x_scale, max)?);
            out.ys.push(quantize_coord("y", p.y, y0, y1, y_scale, max)?);
            out.vs.push(quantize_value(p.v, q.value_scale)?);
        }
        Ok(out)
    }

    /// Invert the quantization into a point store.
    pub fn to_store(&self, q: &Quantization) -> Result<PointStore> {
        let [x0, y0, _, _] = q.bbox;
        let (x_scale, y_scale) = (q.x_scale(), q.y_scale());
        PointStore::from_columns(
            self.xs.iter().map(|&qx| qx as f64 / x_scale + x0).collect(),
            self.ys.iter().map(|&qy| qy as f64 / y_scale + y0).collect(),
            self.vs.iter().map(|&qv| qv as f64 / q.value_scale).collect(),
        )
    }

    /// Reorder points along the Hilbert curve of their quantized coordinates.
    pub fn hilbert_sort(&mut self, bits: u32) {
        let order = hilbert_order(&self.xs, &self.ys, bits);
        self.xs = order.iter().map(|&i| self.xs[i]).collect();
        self.ys = order.iter().map(|&i| self.ys[i]).collect();
        self.vs = order.iter().map(|&i| self.vs[i]).collect();
    }

    /// Merge consecutive points at identical coordinates and drop zero weights.
    /// Expects the points to be sorted so that duplicates are adjacent.
    pub fn consolidate(&mut self, value_scale: f64) -> Result<()> {
        let mut last: Option<(u32, u32)> = None;
        let mut len = 0usize;

        for i in 0..self.len() {
            let (x, y, v) = (self.xs[i], self.ys[i], self.vs[i]);
            if v == 0 { continue }
            if last == Some((x, y)) {
                let target = &mut self.vs[len - 1];
                *target = target.checked_add(v).ok_or_else(|| CodecError::Range {
                    field: "v",
                    value: (*target as f64 + v as f64) / value_scale,
                    reason: "consolidated weight exceeds the 16-bit field",
                })?;
                continue;
            }
            last = Some((x, y));
            self.xs[len] = x;
            self.ys[len] = y;
            self.vs[len] = v;
            len += 1;
        }

        self.xs.truncate(len);
        self.ys.truncate(len);
        self.vs.truncate(len);
        Ok(())
    }

    /// Serialize as three back-to-back little-endian columns.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * BYTES_PER_POINT);
        self.xs.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes()));
        self.ys.iter().for_each(|y| out.extend_from_slice(&y.to_le_bytes()));
        self.vs.iter().for_each(|v| out.extend_from_slice(&v.to_le_bytes()));
        out
    }

    /// Parse a column buffer; its length must be an exact multiple of `BYTES_PER_POINT`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % BYTES_PER_POINT != 0 {
            bail!(CodecError::format("points::codec", format!(
                "buffer of {} bytes is not a multiple of {} bytes per point", bytes.len(), BYTES_PER_POINT
            )));
        }
        let count = bytes.len() / BYTES_PER_POINT;
        let (xs, rest) = bytes.split_at(4 * count);
        let (ys, vs) = rest.split_at(4 * count);

        Ok(Self {
            xs: xs.chunks_exact(4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect(),
            ys: ys.chunks_exact(4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect(),
            vs: vs.chunks_exact(2).map(|b| u16::from_le_bytes([b[0], b[1]])).collect(),
        })
    }
}

fn quantize_coord(field: &'static str, value: f64, lo: f64, hi: f64, scale: f64, max: u32) -> Result<u32> {
    if !(value >= lo && value <= hi) {
        bail!(CodecError::Range { field, value, reason: "outside the quantization bounding box" });
    }
    let q = ((value - lo) * scale).round();
    if q > max as f64 {
        bail!(CodecError::Range { field, value, reason: "exceeds the coordinate bit width" });
    }
    Ok(q as u32)
}

fn quantize_value(value: f64, scale: f64) -> Result<u16> {
    if !(value.is_finite() && value >= 0.0) {
        bail!(CodecError::Range { field: "v", value, reason: "weight must be finite and non-negative" });
    }
    let q = (value * scale).round();
    if q > u16::MAX as f64 {
        bail!(CodecError::Range { field: "v", value, reason: "exceeds the 16-bit field" });
    }
    Ok(q as u16)
}

/// Quantize, Hilbert-sort and consolidate `store`; returns the raw column buffer and the
/// number of points it holds.
pub fn encode(store: &PointStore, q: &Quantization) -> Result<(Vec<u8>, usize)> {
    let mut points = QuantizedPoints::from_store(store, q)?;
    points.hilbert_sort(q.bits);
    points.consolidate(q.value_scale)?;
    Ok((points.to_bytes(), points.len()))
}

/// Decode a raw (already decompressed) column buffer.
pub fn decode(bytes: &[u8], q: &Quantization) -> Result<PointStore> {
    q.validate()?;
    QuantizedPoints::from_bytes(bytes)?.to_store(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::hilbert::hilbert_hash;

    fn quantized(points: &[(u32, u32, u16)]) -> QuantizedPoints {
        QuantizedPoints {
            xs: points.iter().map(|p| p.0).collect(),
            ys: points.iter().map(|p| p.1).collect(),
            vs: points.iter().map(|p| p.2).collect(),
        }
    }

    #[test]
    fn quantizes_relative_to_bbox() {
        let q = Quantization { bbox: [10.0, 50.0, 11.0, 51.0], bits: 16, value_scale: 10.0 };
        let mut store = PointStore::new();
        store.add(10.0, 51.0, 1.25).unwrap();
        store.add(10.5, 50.5, 0.04).unwrap();
        let points = QuantizedPoints::from_store(&store, &q).unwrap();
        assert_eq!(points.xs, vec![0, 32768]);
        assert_eq!(points.ys, vec![65535, 32768]);
        assert_eq!(points.vs, vec![13, 0]);
    }

    #[test]
    fn out_of_bbox_is_a_range_error() {
        let q = Quantization::default();
        let mut store = PointStore::new();
        store.add(25.0, 50.0, 1.0).unwrap();
        let err = QuantizedPoints::from_store(&store, &q).unwrap_err();
        assert!(matches!(err.downcast_ref::<CodecError>(), Some(CodecError::Range { field: "x", .. })));
    }

    #[test]
    fn oversized_weight_is_a_range_error() {
        let q = Quantization::default();
        let mut store = PointStore::new();
        store.add(10.0, 50.0, 7000.0).unwrap();
        let err = QuantizedPoints::from_store(&store, &q).unwrap_err();
        assert!(matches!(err.downcast_ref::<CodecError>(), Some(CodecError::Range { field: "v", .. })));
    }

    #[test]
    fn consolidate_merges_adjacent_duplicates_and_drops_zeros() {
        let mut points = quantized(&[(1, 1, 3), (1, 1, 4), (2, 2, 0), (3, 3, 5), (1, 1, 1)]);
        points.consolidate(10.0).unwrap();
        assert_eq!(points, quantized(&[(1, 1, 7), (3, 3, 5), (1, 1, 1)]));
    }

    #[test]
    fn consolidate_overflow_is_a_range_error() {
        let mut points = quantized(&[(1, 1, u16::MAX), (1, 1, 1)]);
        let err = points.consolidate(10.0).unwrap_err();
        assert!(matches!(err.downcast_ref::<CodecError>(), Some(CodecError::Range { field: "v", .. })));
    }

    #[test]
    fn sort_then_consolidate_is_idempotent() {
        let mut points = quantized(&[(9, 2, 1), (4, 4, 2), (9, 2, 3), (0, 15, 4), (4, 4, 0), (7, 7, 6)]);
        points.hilbert_sort(4);
        points.consolidate(10.0).unwrap();
        let once = points.clone();
        points.hilbert_sort(4);
        points.consolidate(10.0).unwrap();
        assert_eq!(points, once);
        assert_eq!(once.len(), 4);
        let hashes = (0..once.len()).map(|i| hilbert_hash(once.xs[i], once.ys[i], 4)).collect::<Vec<_>>();
        assert!(hashes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn bytes_round_trip_and_size_check() {
        let points = quantized(&[(1, 2, 3), (u32::MAX, 0, u16::MAX)]);
        let bytes = points.to_bytes();
        assert_eq!(bytes.len(), 2 * BYTES_PER_POINT);
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &2u32.to_le_bytes());
        assert_eq!(&bytes[16..18], &3u16.to_le_bytes());
        assert_eq!(QuantizedPoints::from_bytes(&bytes).unwrap(), points);

        let err = QuantizedPoints::from_bytes(&bytes[..19]).unwrap_err();
        assert!(matches!(err.downcast_ref::<CodecError>(), Some(CodecError::Format { .. })));
    }

    #[test]
    fn encode_decode_round_trip() {
        let q = Quantization::default();
        let mut store = PointStore::new();
        store.add(13.377, 52.516, 2.0).unwrap();
        store.add(13.377, 52.516, 1.5).unwrap();
        store.add(6.96, 50.94, 12.3).unwrap();
        store.add(11.58, 48.14, 0.0).unwrap();

        let (bytes, count) = encode(&store, &q).unwrap();
        assert_eq!(count, 2);
        let decoded = decode(&bytes, &q).unwrap();
        assert_eq!(decoded.len(), 2);
        assert!((decoded.total_weight() - 15.8).abs() < 1e-9);

        let berlin = decoded.iter().find(|p| p.x > 13.0).unwrap();
        assert!((berlin.x - 13.377).abs() <= 1.0 / q.x_scale());
        assert!((berlin.y - 52.516).abs() <= 1.0 / q.y_scale());
        assert!((berlin.v - 3.5).abs() < 1e-9);
    }
}
