use geo::{Area, BooleanOps};

use crate::geom::envelope;

use super::{RegionFeature, RegionIndex};

/// Overlaps covering less than this share of the queried feature are dropped.
pub const MIN_OVERLAP_FRACTION: f64 = 1e-6;

/// A feature of the index overlapping a queried feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    /// Index of the overlapping feature in this index.
    pub feature: usize,
    /// Share of the queried feature's area covered by it.
    pub fraction: f64,
}

impl RegionIndex {
    /// Features of this index overlapping `other` (usually a feature of another collection),
    /// in ascending feature index order.
    pub fn find_overlaps(&self, other: &RegionFeature) -> Vec<Overlap> {
        let area = other.area();
        let Some(bbox) = other.bbox().filter(|_| area > 0.0) else { return Vec::new() };

        let mut candidates = self.rtree.locate_in_envelope_intersecting(&envelope(&bbox))
            .map(|cand| cand.idx())
            .collect::<Vec<_>>();
        candidates.sort_unstable();

        candidates.into_iter()
            .filter_map(|i| {
                let rest = other.shape().difference(self.features()[i].shape());
                let fraction = (area - rest.unsigned_area()) / area;
                (fraction >= MIN_OVERLAP_FRACTION).then_some(Overlap { feature: i, fraction })
            })
            .collect()
    }
}
