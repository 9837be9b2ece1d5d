use anyhow::Result;
use geocute::io::tsv::read_points;

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::BuildArgs) -> Result<()> {
    let settings = cli.settings()?;

    log::info!("[build] reading {}", args.input.display());
    let store = read_points(&args.input, true)?;

    store.save(&args.output, &settings.quantization)?;
    Ok(())
}
