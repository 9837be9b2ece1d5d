//! Weighted point clouds: the columnar store, its quantized file codec, the nearest-neighbour
//! lookup used for densification, and region-based merging.

pub mod codec;
mod hilbert;
mod lookup;
mod merge;
mod store;

pub use hilbert::hilbert_hash;
pub use lookup::*;
pub use merge::*;
pub use store::*;
