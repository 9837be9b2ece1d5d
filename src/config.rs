use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Fixed-point encoding parameters shared by point file writers and readers.
/// They are not stored in the file, so both sides must agree on them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quantization {
    /// Bounding box `[x0, y0, x1, y1]` in lon/lat degrees.
    pub bbox: [f64; 4],
    /// Coordinate precision in bits (16 or 32).
    pub bits: u32,
    /// Multiplier applied to weights before rounding (10 = 0.1 precision).
    pub value_scale: f64,
}

impl Default for Quantization {
    fn default() -> Self {
        Self { bbox: [0.0, 40.0, 20.0, 60.0], bits: 32, value_scale: 10.0 }
    }
}

impl Quantization {
    /// Check that the box is non-empty, the bit width is supported and the scale is positive.
    pub fn validate(&self) -> Result<()> {
        let [x0, y0, x1, y1] = self.bbox;
        if !(x1 > x0 && y1 > y0) {
            bail!("[config] quantization bbox {:?} is empty", self.bbox);
        }
        if self.bits != 16 && self.bits != 32 {
            bail!("[config] quantization bits must be 16 or 32, got {}", self.bits);
        }
        if !(self.value_scale.is_finite() && self.value_scale > 0.0) {
            bail!("[config] value_scale must be positive, got {}", self.value_scale);
        }
        Ok(())
    }

    /// Largest quantized coordinate.
    #[inline] pub fn max_coord(&self) -> u32 { ((1u64 << self.bits) - 1) as u32 }

    /// Quantization steps per degree of longitude.
    #[inline] pub fn x_scale(&self) -> f64 { self.max_coord() as f64 / (self.bbox[2] - self.bbox[0]) }

    /// Quantization steps per degree of latitude.
    #[inline] pub fn y_scale(&self) -> f64 { self.max_coord() as f64 / (self.bbox[3] - self.bbox[1]) }
}

/// Resolution of the polygon grid built by `RegionIndex`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    /// Cells along each axis.
    pub cells: usize,
    /// Margin added around the collection bounds, in degrees.
    pub padding: f64,
}

impl Default for GridOptions {
    fn default() -> Self { Self { cells: 300, padding: 1e-6 } }
}

/// Knobs for a matrix run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixOptions {
    /// Hits carrying less weight than this are discarded as noise.
    pub min_residents: f64,
    /// Points classified between two progress callbacks.
    pub chunk_size: usize,
    /// Emit the `error` column.
    pub with_error: bool,
    /// Emit the `method` column.
    pub with_method: bool,
    /// Keep every missed point for the diagnostics side-file.
    pub collect_misses: bool,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self {
            min_residents: 10.0,
            chunk_size: 10_000,
            with_error: true,
            with_method: true,
            collect_misses: true,
        }
    }
}

/// Everything configurable from a settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub quantization: Quantization,
    pub grid: GridOptions,
    pub matrix: MatrixOptions,
}

impl Settings {
    /// Read settings from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("[config] Failed to read settings file {}", path.display()))?;
        let settings: Settings = serde_json::from_slice(&bytes)
            .with_context(|| format!("[config] Failed to parse settings file {}", path.display()))?;
        settings.quantization.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_quantization_is_valid() {
        let q = Quantization::default();
        q.validate().unwrap();
        assert_eq!(q.max_coord(), u32::MAX);
        assert!((q.x_scale() - u32::MAX as f64 / 20.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_bad_bits_and_empty_box() {
        let q = Quantization { bits: 24, ..Default::default() };
        assert!(q.validate().is_err());
        let q = Quantization { bbox: [1.0, 1.0, 1.0, 2.0], ..Default::default() };
        assert!(q.validate().is_err());
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: Settings = serde_json::from_str(r#"{ "matrix": { "min_residents": 100 } }"#).unwrap();
        assert_eq!(settings.matrix.min_residents, 100.0);
        assert_eq!(settings.matrix.chunk_size, 10_000);
        assert_eq!(settings.grid, GridOptions::default());
        assert_eq!(settings.quantization, Quantization::default());
    }
}
