use std::path::Path;

use ahash::AHashMap;
use anyhow::{bail, Result};
use geo::{BooleanOps, BoundingRect, Coord, Intersects, MultiPolygon, Point, Rect};
use rstar::RTree;
use smallvec::SmallVec;

use crate::config::GridOptions;
use crate::error::CodecError;
use crate::geom::{cell_key, BoundingBox, Grid};
use crate::io::geojson::read_features_file;

use super::RegionFeature;

/// The part of a feature that falls inside one grid cell.
#[derive(Debug, Clone)]
pub(crate) struct Fragment {
    feature: usize, // Index of the owning feature
    shape: MultiPolygon<f64>,
    bbox: Rect<f64>,
}

impl Fragment {
    #[inline]
    fn contains(&self, x: f64, y: f64) -> bool {
        let (min, max) = (self.bbox.min(), self.bbox.max());
        x >= min.x && x <= max.x && y >= min.y && y <= max.y
            && self.shape.intersects(&Point::new(x, y))
    }
}

/// Point-in-polygon index over a region collection: features are clipped into the cells of a
/// uniform grid so that a lookup only tests the fragments of a single cell.
#[derive(Debug, Clone)]
pub struct RegionIndex {
    features: Vec<RegionFeature>,
    grid: Option<Grid>, // None when no feature has a bounding box
    cells: AHashMap<u64, Vec<Fragment>>,
    pub(super) rtree: RTree<BoundingBox>,
}

impl RegionIndex {
    /// Build the grid and R-tree over `features`. Each feature is renumbered to its position.
    pub fn new(features: Vec<RegionFeature>, options: GridOptions) -> Self {
        let features = features.into_iter().enumerate()
            .map(|(position, feature)| {
                if feature.index() == position { return feature }
                log::debug!("[regions::index] renumbering feature {} to {position}", feature.index());
                feature.with_index(position)
            })
            .collect::<Vec<_>>();

        let rtree = RTree::bulk_load(features.iter()
            .filter_map(|f| f.bbox().map(|bbox| BoundingBox::new(f.index(), bbox)))
            .collect());

        let grid = features.iter()
            .filter_map(RegionFeature::bbox)
            .reduce(|a, b| Rect::new(
                Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            ))
            .map(|bounds| Grid::new(bounds, options.cells, options.padding));

        let mut cells: AHashMap<u64, Vec<Fragment>> = AHashMap::new();
        if let Some(grid) = &grid {
            for feature in &features {
                let Some(bbox) = feature.bbox() else { continue };
                let (cols, rows) = grid.cells_covering(&bbox);

                if cols.start() == cols.end() && rows.start() == rows.end() {
                    let fragment = Fragment { feature: feature.index(), shape: feature.shape().clone(), bbox };
                    cells.entry(cell_key(*cols.start(), *rows.start())).or_default().push(fragment);
                    continue;
                }

                for cx in cols {
                    for cy in rows.clone() {
                        let cell = MultiPolygon::new(vec![grid.cell_rect(cx, cy).to_polygon()]);
                        let shape = feature.shape().intersection(&cell);
                        let Some(bbox) = shape.bounding_rect() else { continue };
                        cells.entry(cell_key(cx, cy)).or_default()
                            .push(Fragment { feature: feature.index(), shape, bbox });
                    }
                }
            }
        }

        log::debug!("[regions::index] {} features clipped into {} fragments over {} cells",
            features.len(), cells.values().map(Vec::len).sum::<usize>(), cells.len());

        Self { features, grid, cells, rtree }
    }

    /// Read a GeoJSON FeatureCollection and index it.
    pub fn load(path: &Path, options: GridOptions) -> Result<Self> {
        let features = read_features_file(path)?;
        log::info!("[regions::index] indexing {} regions from {}", features.len(), path.display());
        Ok(Self::new(features, options))
    }

    /// Number of features.
    #[inline] pub fn len(&self) -> usize { self.features.len() }

    /// Check if there are no features.
    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    /// Get a reference to the list of features.
    #[inline] pub fn features(&self) -> &[RegionFeature] { &self.features }

    /// Fragments stored in the cell containing `(x, y)`; empty outside the grid.
    pub(crate) fn candidates(&self, x: f64, y: f64) -> &[Fragment] {
        self.grid.as_ref()
            .and_then(|grid| grid.cell_of(x, y))
            .and_then(|(cx, cy)| self.cells.get(&cell_key(cx, cy)))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The feature containing `(x, y)` (boundary inclusive).
    ///
    /// When features overlap, the one with the smallest area wins (ties go to the lower index)
    /// and the competition is logged.
    pub fn classify(&self, x: f64, y: f64) -> Option<&RegionFeature> {
        let mut matches: SmallVec<[usize; 4]> = SmallVec::new();
        for fragment in self.candidates(x, y) {
            if !matches.contains(&fragment.feature) && fragment.contains(x, y) {
                matches.push(fragment.feature);
            }
        }

        let best = match matches.as_slice() {
            [] => return None,
            [only] => *only,
            several => {
                let best = several.iter().copied()
                    .min_by(|&a, &b| self.features[a].area().total_cmp(&self.features[b].area()).then(a.cmp(&b)))?;
                let names = several.iter()
                    .map(|&i| format!("#{i} {}", serde_json::Value::Object(self.features[i].public_properties())))
                    .collect::<Vec<_>>();
                log::warn!("[regions::index] point ({x}, {y}) lies in {} regions, picking #{best}: {}",
                    several.len(), names.join(", "));
                best
            }
        };
        self.features.get(best)
    }

    /// Fail unless every feature carries a non-null `key` property.
    pub fn require_key(&self, key: &str) -> Result<()> {
        let mut missing = self.features.iter().filter(|f| f.key_string(key).is_none());
        if let Some(first) = missing.next() {
            bail!(CodecError::format("regions::index", format!(
                "{} of {} features lack the key property {key:?} (first: feature {})",
                1 + missing.count(), self.len(), first.index()
            )));
        }
        Ok(())
    }
}
