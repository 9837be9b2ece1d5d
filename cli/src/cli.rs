use std::path::PathBuf;

use anyhow::Result;
use geocute::Settings;

/// Population conversion matrices between region collections
#[derive(clap::Parser, Debug)]
#[command(name = "geocute", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON settings file (quantization, grid and matrix options)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Settings from `--config`, or the defaults.
    pub fn settings(&self) -> Result<Settings> {
        match &self.config {
            Some(path) => Settings::from_json_file(path),
            None => Ok(Settings::default()),
        }
    }
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Compute the conversion matrix from one region collection to another
    Matrix(MatrixArgs),

    /// Encode a TSV of x, y, residents into a point file
    Build(BuildArgs),

    /// Decode a point file into a TSV of x, y, residents
    Export(ExportArgs),

    /// Spread census grid populations onto address points
    Densify(DensifyArgs),

    /// Combine point files by region membership
    Merge(MergeArgs),
}

#[derive(clap::Args, Debug)]
pub struct MatrixArgs {
    /// Source regions (GeoJSON, optionally .gz/.br)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub geo1: PathBuf,

    /// Key property of the source regions
    pub key1: String,

    /// Target regions (GeoJSON, optionally .gz/.br)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub geo2: PathBuf,

    /// Key property of the target regions
    pub key2: String,

    /// Output TSV file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Point file, defaults to "data/deutschland.bin.gz"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub points: Option<PathBuf>,

    /// Drop hits with fewer residents than this
    #[arg(long)]
    pub min_residents: Option<f64>,

    /// Omit the error column
    #[arg(long)]
    pub no_error: bool,

    /// Omit the method column
    #[arg(long)]
    pub no_method: bool,

    /// Don't write the diagnostics GeoJSON files
    #[arg(long)]
    pub no_diagnostics: bool,
}

#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    /// Input TSV (x, y, residents), optionally .gz/.br
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output point file (.bin.gz or .bin.br)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Input point file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output TSV file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct DensifyArgs {
    /// Address points (TSV of x, y), optionally .gz/.br
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub addresses: PathBuf,

    /// Census grid (TSV of x, y, residents), optionally .gz/.br
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub grid: PathBuf,

    /// Output point file (.bin.gz or .bin.br)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Kernel radius in meters
    #[arg(short, long, default_value_t = geocute::points::DEFAULT_SPREAD_RADIUS)]
    pub radius: f64,
}

#[derive(clap::Args, Debug)]
pub struct MergeArgs {
    /// Regions used to split the sources (GeoJSON)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub regions: PathBuf,

    /// Property holding the region ids
    pub key: String,

    /// Output point file (.bin.gz or .bin.br)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Source restricted to regions, as ID[,ID...]=FILE
    #[arg(short, long = "source", required = true)]
    pub sources: Vec<String>,

    /// Source used everywhere outside the listed regions
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub default: Option<PathBuf>,
}
