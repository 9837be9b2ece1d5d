//! Region collections: GeoJSON features, the gridded point-in-polygon index,
//! membership predicates and area-overlap estimates.

mod feature;
mod index;
mod membership;
mod overlap;

pub use feature::{property_string, RegionFeature};
pub use index::RegionIndex;
pub use membership::Membership;
pub use overlap::{Overlap, MIN_OVERLAP_FRACTION};
