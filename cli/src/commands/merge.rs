use std::path::Path;

use anyhow::{Context, Result};
use geocute::points::{merge_by_membership, MergeSource};
use geocute::{PointStore, RegionIndex};

/// Split `ID[,ID...]=FILE`.
fn parse_source(spec: &str) -> Result<(Vec<String>, &str)> {
    let (ids, path) = spec.split_once('=')
        .with_context(|| format!("[merge] source {spec:?} is not of the form ID[,ID...]=FILE"))?;
    Ok((ids.split(',').map(|id| id.trim().to_string()).collect(), path))
}

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::MergeArgs) -> Result<()> {
    let settings = cli.settings()?;
    let regions = RegionIndex::load(&args.regions, settings.grid)?;

    let mut loaded = Vec::with_capacity(args.sources.len());
    for spec in &args.sources {
        let (ids, path) = parse_source(spec)?;
        loaded.push((ids, PointStore::load(Path::new(path), &settings.quantization)?));
    }
    let default = args.default.as_ref()
        .map(|path| PointStore::load(path, &settings.quantization))
        .transpose()?;

    let sources = loaded.iter()
        .map(|(ids, points)| MergeSource { ids: ids.clone(), points })
        .collect::<Vec<_>>();
    let merged = merge_by_membership(&regions, &args.key, &sources, default.as_ref())?;

    merged.save(&args.output, &settings.quantization)?;
    Ok(())
}
