
mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{build, densify, export, matrix, merge};

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Matrix(args) => matrix::run(&cli, args),
        Commands::Build(args) => build::run(&cli, args),
        Commands::Export(args) => export::run(&cli, args),
        Commands::Densify(args) => densify::run(&cli, args),
        Commands::Merge(args) => merge::run(&cli, args),
    }
}

/// `RUST_LOG` wins over the `-v` counter.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> anyhow::Result<()> { run() }
