use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::{json, Map};

use crate::common::sibling_with_suffix;
use crate::io::geojson::{feature_collection, point_feature, region_feature, write_geojson};
use crate::regions::RegionIndex;

/// Per-source fraction sums further than this from 1 are reported.
pub const FRACTION_SUM_TOLERANCE: f64 = 1e-6;

/// A point that at least one region collection failed to classify.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissedPoint {
    pub x: f64,
    pub y: f64,
    pub v: f64,
    /// Source region the point fell into, if any.
    pub region1: Option<usize>,
    /// Target region the point fell into, if any.
    pub region2: Option<usize>,
}

/// A source region whose emitted fractions don't add up to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceDeviation {
    pub source: usize,
    pub fraction_sum: f64,
}

/// Statistics and coverage gaps of a matrix run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixReport {
    /// Weight of every point streamed.
    pub total: f64,
    /// Weight of points outside every source region.
    pub missed1: f64,
    /// Weight of points outside every target region.
    pub missed2: f64,
    /// Weight of hits dropped for falling below the residents threshold.
    pub ignored: f64,
    pub misses: Vec<MissedPoint>,
    /// Source regions without hits and without any overlapping target region.
    pub no_overlaps: Vec<usize>,
    /// Target regions that received nothing, neither hits nor overlap estimates.
    pub no_hits: Vec<usize>,
    pub incomplete_sources: Vec<SourceDeviation>,
}

#[inline]
fn percent(part: f64, total: f64) -> f64 {
    if total > 0.0 { 100.0 * part / total } else { 0.0 }
}

impl MatrixReport {
    #[inline] pub fn missed1_percent(&self) -> f64 { percent(self.missed1, self.total) }
    #[inline] pub fn missed2_percent(&self) -> f64 { percent(self.missed2, self.total) }
    #[inline] pub fn ignored_percent(&self) -> f64 { percent(self.ignored, self.total) }

    /// False when some target region can't be reached from any source region.
    #[inline] pub fn is_complete(&self) -> bool { self.no_hits.is_empty() }

    /// Log the run summary; gaps are logged as warnings.
    pub fn log_summary(&self) {
        log::info!("[matrix] misses in geo 1: {:.3}%", self.missed1_percent());
        log::info!("[matrix] misses in geo 2: {:.3}%", self.missed2_percent());
        log::info!("[matrix] ignored residents: {:.3}%", self.ignored_percent());
        if !self.no_overlaps.is_empty() {
            log::warn!("[matrix] {} source regions have neither hits nor overlaps: {:?}", self.no_overlaps.len(), self.no_overlaps);
        }
        if !self.no_hits.is_empty() {
            log::warn!("[matrix] {} target regions received no hits: {:?}", self.no_hits.len(), self.no_hits);
        }
        if !self.incomplete_sources.is_empty() {
            log::warn!("[matrix] fractions of {} source regions don't sum to 1", self.incomplete_sources.len());
            for deviation in &self.incomplete_sources {
                log::debug!("[matrix]   source #{}: {:.6}", deviation.source, deviation.fraction_sum);
            }
        }
    }

    /// Write the non-empty diagnostics next to `output`
    /// (`<stem>_misses.geojson`, `<stem>_nooverlaps.geojson`, `<stem>_nohits.geojson`).
    /// Returns the written paths.
    pub fn write_diagnostics(&self, output: &Path, index1: &RegionIndex, index2: &RegionIndex) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        if !self.misses.is_empty() {
            let features = self.misses.iter()
                .map(|miss| {
                    let mut properties = Map::new();
                    properties.insert("residents".to_string(), json!(miss.v));
                    properties.insert("_index1".to_string(), json!(miss.region1));
                    properties.insert("_index2".to_string(), json!(miss.region2));
                    point_feature(miss.x, miss.y, properties)
                })
                .collect();
            let path = sibling_with_suffix(output, "_misses.geojson");
            write_geojson(&path, &feature_collection(features))?;
            written.push(path);
        }

        for (regions, index, suffix) in [
            (&self.no_overlaps, index1, "_nooverlaps.geojson"),
            (&self.no_hits, index2, "_nohits.geojson"),
        ] {
            if regions.is_empty() { continue }
            let features = regions.iter().map(|&i| region_feature(&index.features()[i])).collect();
            let path = sibling_with_suffix(output, suffix);
            write_geojson(&path, &feature_collection(features))?;
            written.push(path);
        }

        for path in &written {
            log::info!("[matrix] wrote diagnostics {}", path.display());
        }
        Ok(written)
    }
}
