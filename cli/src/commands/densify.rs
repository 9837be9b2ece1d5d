use anyhow::Result;
use geocute::io::tsv::read_points;
use geocute::points::{densify_grid, DEFAULT_GRID_SCALE};
use geocute::PointLookup;

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::DensifyArgs) -> Result<()> {
    let settings = cli.settings()?;

    let addresses = read_points(&args.addresses, false)?;
    // Addresses only mark where people live; their weight comes from the grid.
    let mut lookup = PointLookup::with_limit(addresses.limit(), DEFAULT_GRID_SCALE);
    for p in addresses.iter() {
        lookup.add(p.x, p.y, 0.0)?;
    }

    let grid = read_points(&args.grid, true)?;
    log::info!("[densify] spreading {} grid points over {} addresses within {} m",
        grid.len(), lookup.len(), args.radius);
    densify_grid(&mut lookup, grid.iter(), args.radius)?;

    lookup.into_points().save(&args.output, &settings.quantization)?;
    Ok(())
}
