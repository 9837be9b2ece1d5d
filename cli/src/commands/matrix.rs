use anyhow::{bail, Result};
use geocute::{MatrixBuilder, PointStore, RegionIndex};

/// Point file used when `--points` is not given.
const DEFAULT_POINTS: &str = "data/deutschland.bin.gz";

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::MatrixArgs) -> Result<()> {
    let settings = cli.settings()?;
    let mut options = settings.matrix.clone();
    if let Some(min_residents) = args.min_residents { options.min_residents = min_residents }
    options.with_error &= !args.no_error;
    options.with_method &= !args.no_method;
    options.collect_misses &= !args.no_diagnostics;

    let points_path = args.points.clone().unwrap_or(DEFAULT_POINTS.into());
    log::info!("[matrix] loading points from {}", points_path.display());
    let points = PointStore::load(&points_path, &settings.quantization)?;

    log::info!("[matrix] loading regions {}", args.geo1.display());
    let index1 = RegionIndex::load(&args.geo1, settings.grid)?;
    log::info!("[matrix] loading regions {}", args.geo2.display());
    let index2 = RegionIndex::load(&args.geo2, settings.grid)?;

    let builder = MatrixBuilder::new(&index1, &args.key1, &index2, &args.key2, options)?;
    let mut next_report = 0;
    let matrix = builder.run(&points, |done, total| {
        let percent = 100 * done / total.max(1);
        if percent >= next_report {
            log::info!("[matrix] {percent}% of points classified");
            next_report = percent + 10;
        }
    });

    let options = builder.options();
    matrix.write_tsv(&args.output, options.with_error, options.with_method)?;
    if !args.no_diagnostics {
        matrix.report.write_diagnostics(&args.output, &index1, &index2)?;
    }

    if !matrix.report.is_complete() {
        bail!("[matrix] {} target regions received no residents; the matrix is incomplete",
            matrix.report.no_hits.len());
    }
    Ok(())
}
