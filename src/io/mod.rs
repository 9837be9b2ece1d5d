//! IO module for format-specific reading and writing operations.
//!
//! # Format Modules
//!
//! - `geojson` - GeoJSON FeatureCollections: region sources in, diagnostics out
//! - `tsv` - tab-separated raw point sources (optionally gzip/brotli compressed)
//!
//! The binary point file format lives in `points::codec`, next to `PointStore`.

pub mod geojson;
pub mod tsv;
