use anyhow::Result;
use geocute::PointStore;

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::ExportArgs) -> Result<()> {
    let settings = cli.settings()?;
    let store = PointStore::load(&args.input, &settings.quantization)?;

    log::info!("[export] writing {} points to {}", store.len(), args.output.display());
    store.export_tsv(&args.output)
}
