use ahash::{AHashMap, AHashSet};
use anyhow::{Context, Result};

use crate::config::MatrixOptions;
use crate::points::PointStore;
use crate::regions::RegionIndex;

use super::report::{MissedPoint, SourceDeviation, FRACTION_SUM_TOLERANCE};
use super::{ConversionMatrix, MatrixEntry, MatrixReport, Method};

/// Variance of the binomial share `v / count1`, scaled by the hit's weight on the target side.
#[inline]
pub fn error_estimate(v: f64, count1: f64, count2: f64) -> f64 {
    let fraction = v / count1;
    fraction * (1.0 - fraction) * v / count2
}

/// Result of streaming the points through both indexes.
#[derive(Debug, Default)]
struct Streamed {
    hits: AHashMap<(usize, usize), f64>,
    total: f64,
    missed1: f64,
    missed2: f64,
    misses: Vec<MissedPoint>,
}

/// Builds the conversion matrix between two region collections from a weighted point cloud.
#[derive(Debug, Clone)]
pub struct MatrixBuilder<'a> {
    index1: &'a RegionIndex,
    key1: &'a str,
    index2: &'a RegionIndex,
    key2: &'a str,
    options: MatrixOptions,
}

impl<'a> MatrixBuilder<'a> {
    /// Fails unless every source feature has `key1` and every target feature has `key2`.
    pub fn new(
        index1: &'a RegionIndex,
        key1: &'a str,
        index2: &'a RegionIndex,
        key2: &'a str,
        options: MatrixOptions,
    ) -> Result<Self> {
        index1.require_key(key1).context("[matrix] Invalid source regions")?;
        index2.require_key(key2).context("[matrix] Invalid target regions")?;
        Ok(Self { index1, key1, index2, key2, options })
    }

    /// Get a reference to the run options.
    #[inline] pub fn options(&self) -> &MatrixOptions { &self.options }

    /// Classify every point and derive the matrix. `progress(done, total)` is called after
    /// every chunk of `options.chunk_size` points.
    pub fn run(&self, points: &PointStore, progress: impl FnMut(usize, usize)) -> ConversionMatrix {
        log::info!("[matrix] streaming {} points", points.len());
        let streamed = self.stream(points, progress);

        let (count1, count2) = self.aggregate(&streamed.hits);

        let mut report = MatrixReport {
            total: streamed.total,
            missed1: streamed.missed1,
            missed2: streamed.missed2,
            misses: streamed.misses,
            ..Default::default()
        };
        let entries = self.reconcile(streamed.hits, &count1, &count2, &mut report);

        report.incomplete_sources = fraction_deviations(&entries, &count1);
        report.log_summary();
        log::info!("[matrix] emitting {} rows", entries.len());

        ConversionMatrix {
            key1: self.key1.to_string(),
            key2: self.key2.to_string(),
            entries,
            report,
        }
    }

    fn stream(&self, points: &PointStore, mut progress: impl FnMut(usize, usize)) -> Streamed {
        let mut streamed = Streamed::default();
        let total = points.len();

        for chunk in points.chunks(self.options.chunk_size) {
            let done = chunk.offset + chunk.len();
            for p in chunk.iter() {
                let region1 = self.index1.classify(p.x, p.y).map(|f| f.index());
                let region2 = self.index2.classify(p.x, p.y).map(|f| f.index());

                streamed.total += p.v;
                if let (Some(i1), Some(i2)) = (region1, region2) {
                    *streamed.hits.entry((i1, i2)).or_insert(0.0) += p.v;
                    continue;
                }

                if region1.is_none() { streamed.missed1 += p.v }
                if region2.is_none() { streamed.missed2 += p.v }
                if self.options.collect_misses {
                    streamed.misses.push(MissedPoint { x: p.x, y: p.y, v: p.v, region1, region2 });
                }
            }
            log::debug!("[matrix] classified {done} of {total} points");
            progress(done, total);
        }
        streamed
    }

    /// Per-region totals over every raw hit.
    fn aggregate(&self, hits: &AHashMap<(usize, usize), f64>) -> (Vec<f64>, Vec<f64>) {
        let mut count1 = vec![0.0; self.index1.len()];
        let mut count2 = vec![0.0; self.index2.len()];
        for (&(i1, i2), &v) in hits {
            count1[i1] += v;
            count2[i2] += v;
        }
        (count1, count2)
    }

    /// Drop noise hits, fill source gaps from the area overlap and collect the rows,
    /// sorted by source then target index.
    fn reconcile(
        &self,
        hits: AHashMap<(usize, usize), f64>,
        count1: &[f64],
        count2: &[f64],
        report: &mut MatrixReport,
    ) -> Vec<MatrixEntry> {
        let features1 = self.index1.features();
        let features2 = self.index2.features();
        let key1 = |i: usize| features1[i].key_string(self.key1).unwrap_or_default();
        let key2 = |i: usize| features2[i].key_string(self.key2).unwrap_or_default();

        let mut entries = Vec::with_capacity(hits.len());
        for ((i1, i2), v) in hits {
            // Weightless hits carry no share; the source falls back to the area overlap.
            if v <= 0.0 { continue }
            if v < self.options.min_residents {
                report.ignored += v;
                continue;
            }
            entries.push(MatrixEntry {
                source: i1,
                target: i2,
                key1: key1(i1),
                key2: key2(i2),
                fraction: v / count1[i1],
                residents: v,
                error: error_estimate(v, count1[i1], count2[i2]),
                method: Method::Point,
            });
        }

        let mut reached = AHashSet::new();
        for feature in features1.iter().filter(|f| count1[f.index()] == 0.0) {
            let overlaps = self.index2.find_overlaps(feature);
            if overlaps.is_empty() {
                log::warn!("[matrix] source region {:?} has no hits and no overlapping target region",
                    key1(feature.index()));
                report.no_overlaps.push(feature.index());
                continue;
            }
            log::debug!("[matrix] source region {:?} has no hits, estimating from {} overlaps",
                key1(feature.index()), overlaps.len());
            for overlap in overlaps {
                reached.insert(overlap.feature);
                entries.push(MatrixEntry {
                    source: feature.index(),
                    target: overlap.feature,
                    key1: key1(feature.index()),
                    key2: key2(overlap.feature),
                    fraction: overlap.fraction,
                    residents: 0.0,
                    error: 1.0,
                    method: Method::OverlappingArea,
                });
            }
        }

        report.no_hits = features2.iter()
            .map(|f| f.index())
            .filter(|&i2| count2[i2] == 0.0 && !reached.contains(&i2))
            .collect();

        entries.sort_by_key(|e| (e.source, e.target));
        entries
    }
}

/// Source regions whose fractions sum to something other than 1, including sources with
/// residents whose every row fell below the threshold (sum 0).
fn fraction_deviations(entries: &[MatrixEntry], count1: &[f64]) -> Vec<SourceDeviation> {
    let mut sums: Vec<Option<f64>> = vec![None; count1.len()];
    for entry in entries {
        *sums[entry.source].get_or_insert(0.0) += entry.fraction;
    }

    sums.into_iter().enumerate()
        .filter_map(|(source, sum)| {
            let fraction_sum = match sum {
                Some(sum) => sum,
                None if count1[source] > 0.0 => 0.0,
                None => return None, // Reported as `no_overlaps`
            };
            ((fraction_sum - 1.0).abs() > FRACTION_SUM_TOLERANCE)
                .then_some(SourceDeviation { source, fraction_sum })
        })
        .collect()
}
