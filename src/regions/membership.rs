use ahash::AHashSet;
use geo::{BooleanOps, BoundingRect, Intersects, MultiPolygon, Point, Rect};

use super::{RegionFeature, RegionIndex};

/// Point predicate for "inside the union of a set of regions".
#[derive(Debug, Clone)]
pub struct Membership {
    shape: MultiPolygon<f64>,
    bbox: Option<Rect<f64>>, // None when no region matched
}

impl Membership {
    /// Check whether `(x, y)` lies in the union (boundary inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let Some(bbox) = self.bbox else { return false };
        let (min, max) = (bbox.min(), bbox.max());
        if x < min.x || x > max.x || y < min.y || y > max.y { return false }
        self.shape.intersects(&Point::new(x, y))
    }

    /// Get a reference to the merged shape.
    #[inline] pub fn shape(&self) -> &MultiPolygon<f64> { &self.shape }
}

impl RegionIndex {
    /// Predicate for the union of all features whose `key` property is one of `ids`.
    pub fn membership<S: AsRef<str>>(&self, ids: &[S], key: &str) -> Membership {
        let ids = ids.iter().map(AsRef::as_ref).collect::<AHashSet<&str>>();
        let selected = self.features().iter()
            .filter(|f| f.key_string(key).is_some_and(|id| ids.contains(id.as_str())))
            .collect::<Vec<&RegionFeature>>();

        if selected.is_empty() {
            log::warn!("[regions::membership] no region has {key} in {ids:?}; nothing will match");
        }

        let shape = selected.iter()
            .map(|f| f.shape().clone())
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| MultiPolygon::new(Vec::new()));
        let bbox = shape.bounding_rect();
        Membership { shape, bbox }
    }
}
