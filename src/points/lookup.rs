use std::f64::consts::PI;

use ahash::AHashMap;
use anyhow::{Context, Result};

use crate::geom::{cell_key, haversine_distance, METERS_PER_DEGREE};

use super::{Point, PointStore, DEFAULT_POINT_LIMIT};

/// Grid cells per degree used by `PointLookup::new`.
pub const DEFAULT_GRID_SCALE: f64 = 100.0;

/// Kernel radius for spreading census grid cells onto address points, in meters.
pub const DEFAULT_SPREAD_RADIUS: f64 = 300.0;

/// Half-width cap, in degrees, of the longitude window searched by `find_nearby`.
const MAX_LONGITUDE_SPAN: f64 = 180.0;

/// A candidate returned by `PointLookup::find_nearby`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Handle for `PointLookup::inc`.
    pub index: usize,
    /// Great-circle distance to the query point, in meters. May exceed the query radius.
    pub distance: f64,
}

/// Result of `densify_grid`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DensifyStats {
    /// Grid points whose weight was spread onto nearby points.
    pub spread: usize,
    /// Grid points with no point in range, kept as isolated points.
    pub lonely: usize,
    /// Weight carried by the lonely grid points.
    pub lonely_weight: f64,
}

/// Uniform hash grid over the locations of an owned point store.
#[derive(Debug, Clone)]
pub struct PointLookup {
    points: PointStore,
    grid: AHashMap<u64, Vec<u32>>,
    grid_scale: f64,
}

impl Default for PointLookup {
    fn default() -> Self { Self::new() }
}

impl PointLookup {
    pub fn new() -> Self { Self::with_limit(DEFAULT_POINT_LIMIT, DEFAULT_GRID_SCALE) }

    /// Empty lookup holding at most `limit` points, with `grid_scale` cells per degree.
    pub fn with_limit(limit: usize, grid_scale: f64) -> Self {
        Self { points: PointStore::with_limit(limit), grid: AHashMap::new(), grid_scale }
    }

    /// Index every point of `store`.
    pub fn from_store(store: &PointStore, grid_scale: f64) -> Result<Self> {
        let mut lookup = Self::with_limit(store.limit(), grid_scale);
        for p in store.iter() {
            lookup.add(p.x, p.y, p.v)?;
        }
        Ok(lookup)
    }

    /// Number of points.
    #[inline] pub fn len(&self) -> usize { self.points.len() }

    /// Check if there are no points.
    #[inline] pub fn is_empty(&self) -> bool { self.points.is_empty() }

    /// Get a reference to the indexed points.
    #[inline] pub fn points(&self) -> &PointStore { &self.points }

    /// Give up the index and keep the points.
    #[inline] pub fn into_points(self) -> PointStore { self.points }

    #[inline]
    fn cell(&self, x: f64, y: f64) -> (i32, i32) {
        ((x * self.grid_scale).floor() as i32, (y * self.grid_scale).floor() as i32)
    }

    /// Add a point and return its handle.
    pub fn add(&mut self, x: f64, y: f64, v: f64) -> Result<usize> {
        let index = self.points.add(x, y, v)?;
        let handle = u32::try_from(index)
            .context("[points::lookup] point index does not fit the grid's u32 handles")?;
        let (cx, cy) = self.cell(x, y);
        self.grid.entry(cell_key(cx, cy)).or_default().push(handle);
        Ok(index)
    }

    /// All points in grid cells overlapping the box of `radius` meters around `(x, y)`.
    /// Candidates farther than `radius` are included; filter on `Neighbor::distance`.
    pub fn find_nearby(&self, x: f64, y: f64, radius: f64) -> Vec<Neighbor> {
        let ry = radius / METERS_PER_DEGREE;
        // Longitude span explodes towards the poles; never scan past a full turn.
        let rx = (ry / y.to_radians().cos().abs()).min(MAX_LONGITUDE_SPAN);

        let (cx0, cy0) = self.cell(x - rx, y - ry);
        let (cx1, cy1) = self.cell(x + rx, y + ry);

        let mut neighbors = Vec::new();
        for cx in cx0..=cx1 {
            for cy in cy0..=cy1 {
                let Some(indices) = self.grid.get(&cell_key(cx, cy)) else { continue };
                neighbors.extend(indices.iter().map(|&i| {
                    let i = i as usize;
                    Neighbor { index: i, distance: haversine_distance(x, y, self.points.xs()[i], self.points.ys()[i]) }
                }));
            }
        }
        neighbors
    }

    /// Add `v` to the weight of the point behind `handle`.
    #[inline] pub fn inc(&mut self, handle: usize, v: f64) { self.points.inc(handle, v) }

    /// Spread weight `v` at `(x, y)` onto the points within `radius` meters using a raised-cosine
    /// kernel. Returns false, leaving every weight untouched, when no point is in range.
    pub fn spread(&mut self, x: f64, y: f64, v: f64, radius: f64) -> bool {
        let neighbors = self.find_nearby(x, y, radius);
        let weights = neighbors.iter()
            .map(|n| raised_cosine(n.distance, radius))
            .collect::<Vec<_>>();
        let sum = weights.iter().sum::<f64>();
        if sum <= 0.0 { return false }

        for (neighbor, weight) in neighbors.iter().zip(&weights) {
            if *weight > 0.0 {
                self.inc(neighbor.index, v * weight / sum);
            }
        }
        true
    }
}

/// Raised-cosine kernel: 1 at distance 0, falling to 0 at `radius`, 0 beyond.
#[inline]
pub fn raised_cosine(distance: f64, radius: f64) -> f64 {
    if distance > radius { 0.0 } else { (distance / radius * PI).cos() * 0.5 + 0.5 }
}

/// Spread every census grid point onto the points of `lookup`; grid points with no point
/// in range are appended as isolated points so that no weight is lost.
pub fn densify_grid(lookup: &mut PointLookup, grid: impl IntoIterator<Item = Point>, radius: f64) -> Result<DensifyStats> {
    let mut stats = DensifyStats::default();
    let mut lonely = Vec::new();

    for p in grid {
        if lookup.spread(p.x, p.y, p.v, radius) {
            stats.spread += 1;
        } else {
            lonely.push(p);
        }
    }

    stats.lonely = lonely.len();
    for p in lonely {
        stats.lonely_weight += p.v;
        lookup.add(p.x, p.y, p.v)?;
    }

    log::info!("[points::lookup] spread {} grid points, kept {} isolated ({:.1} residents)",
        stats.spread, stats.lonely, stats.lonely_weight);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Meters to degrees of latitude.
    fn lat(m: f64) -> f64 { m / METERS_PER_DEGREE }

    #[test]
    fn kernel_shape() {
        assert_eq!(raised_cosine(0.0, 300.0), 1.0);
        assert!((raised_cosine(150.0, 300.0) - 0.5).abs() < 1e-12);
        assert!(raised_cosine(300.0, 300.0).abs() < 1e-12);
        assert_eq!(raised_cosine(301.0, 300.0), 0.0);
    }

    #[test]
    fn find_nearby_returns_candidates_with_distances() {
        let mut lookup = PointLookup::new();
        let near = lookup.add(13.4, 52.5 + lat(100.0), 0.0).unwrap();
        let far = lookup.add(13.4, 52.5 + lat(250.0), 0.0).unwrap();
        lookup.add(14.4, 52.5, 0.0).unwrap();

        let neighbors = lookup.find_nearby(13.4, 52.5, 200.0);
        let near_hit = neighbors.iter().find(|n| n.index == near).unwrap();
        assert!((near_hit.distance - 100.0).abs() < 1.0);
        assert!(neighbors.iter().all(|n| n.index == near || n.index == far));
        if let Some(far_hit) = neighbors.iter().find(|n| n.index == far) {
            assert!(far_hit.distance > 200.0);
        }
    }

    #[test]
    fn find_nearby_at_the_pole_scans_a_bounded_window() {
        let mut lookup = PointLookup::new();
        let across = lookup.add(-170.0, 90.0 - lat(100.0), 0.0).unwrap();
        lookup.add(10.0, 80.0, 0.0).unwrap();

        let neighbors = lookup.find_nearby(10.0, 90.0, 200.0);
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].index, across);
        assert!((neighbors[0].distance - 100.0).abs() < 1.0);
    }

    #[test]
    fn spread_splits_weight_between_equidistant_points() {
        let mut lookup = PointLookup::new();
        let a = lookup.add(13.4, 52.5 + lat(50.0), 0.0).unwrap();
        let b = lookup.add(13.4, 52.5 - lat(50.0), 0.0).unwrap();
        assert!(lookup.spread(13.4, 52.5, 100.0, DEFAULT_SPREAD_RADIUS));
        let (va, vb) = (lookup.points().vs()[a], lookup.points().vs()[b]);
        assert!((va + vb - 100.0).abs() < 1e-9);
        assert!((va - vb).abs() < 1e-3);
    }

    #[test]
    fn spread_favours_closer_points() {
        let mut lookup = PointLookup::new();
        let close = lookup.add(13.4, 52.5 + lat(20.0), 0.0).unwrap();
        let distant = lookup.add(13.4, 52.5 + lat(250.0), 0.0).unwrap();
        assert!(lookup.spread(13.4, 52.5, 10.0, DEFAULT_SPREAD_RADIUS));
        assert!(lookup.points().vs()[close] > lookup.points().vs()[distant]);
    }

    #[test]
    fn from_store_indexes_existing_points() {
        let mut store = PointStore::new();
        store.add(13.4, 52.5, 1.0).unwrap();
        store.add(13.4, 52.5 + lat(30.0), 2.0).unwrap();
        let lookup = PointLookup::from_store(&store, DEFAULT_GRID_SCALE).unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.find_nearby(13.4, 52.5, 50.0).len(), 2);
    }

    #[test]
    fn densify_keeps_lonely_grid_points() {
        let mut lookup = PointLookup::new();
        lookup.add(13.4, 52.5, 0.0).unwrap();
        let grid = vec![Point::new(13.4, 52.5 + lat(10.0), 40.0), Point::new(10.0, 50.0, 7.0)];

        let stats = densify_grid(&mut lookup, grid, DEFAULT_SPREAD_RADIUS).unwrap();
        assert_eq!(stats.spread, 1);
        assert_eq!(stats.lonely, 1);
        assert_eq!(lookup.len(), 2);
        assert!((lookup.points().total_weight() - 47.0).abs() < 1e-9);
        assert_eq!(lookup.points().get(1), Some(Point::new(10.0, 50.0, 7.0)));
    }
}
