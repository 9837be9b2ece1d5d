use std::fmt;

use serde::Serialize;

/// How a matrix row was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Method {
    /// Counted from classified points.
    #[serde(rename = "point")]
    Point,
    /// Estimated from the geometric overlap of a source region that no point hit.
    #[serde(rename = "overlapping area")]
    OverlappingArea,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point => write!(f, "point"),
            Self::OverlappingArea => write!(f, "overlapping area"),
        }
    }
}

/// One row of a conversion matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixEntry {
    /// Index of the source region.
    pub source: usize,
    /// Index of the target region.
    pub target: usize,
    pub key1: String,
    pub key2: String,
    /// Share of the source region's residents living in the target region.
    pub fraction: f64,
    pub residents: f64,
    pub error: f64,
    pub method: Method,
}

impl MatrixEntry {
    /// Tab-separated row; optional columns follow the header produced with the same flags.
    pub fn to_tsv_row(&self, with_error: bool, with_method: bool) -> String {
        let mut row = format!("{}\t{}\t{:.6}\t{:.1}", self.key1, self.key2, self.fraction, self.residents);
        if with_error {
            row.push_str(&format!("\t{:.6}", self.error));
        }
        if with_method {
            row.push_str(&format!("\t{}", self.method));
        }
        row
    }
}
