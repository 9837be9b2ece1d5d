#![doc = "geocute: population conversion matrices between non-aligned region collections"]
mod common;
mod geom;

pub mod config;
pub mod error;
pub mod io;
pub mod matrix;
pub mod points;
pub mod regions;

#[doc(inline)]
pub use common::Compression;

#[doc(inline)]
pub use config::{GridOptions, MatrixOptions, Quantization, Settings};

#[doc(inline)]
pub use error::CodecError;

#[doc(inline)]
pub use geom::haversine_distance;

#[doc(inline)]
pub use matrix::{ConversionMatrix, MatrixBuilder, MatrixEntry, MatrixReport, Method};

#[doc(inline)]
pub use points::{Point, PointLookup, PointStore};

#[doc(inline)]
pub use regions::{Membership, RegionFeature, RegionIndex};
