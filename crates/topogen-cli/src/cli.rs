use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The topogen Developers",
    version,
    about = "topogen - Builds molecular-mechanics topologies (bonded terms, virtual sites, polarizable shells, charges) from molecules and a force field.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads used to process molecules in parallel.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate topology files for every molecule in a molecule file.
    Generate(GenerateArgs),
    /// Validate a force field and, optionally, a molecule file without writing anything.
    Check(CheckArgs),
}

/// Arguments for the `generate` subcommand.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    // --- Core Arguments ---
    /// Path to the force-field parameter file (TOML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub forcefield: PathBuf,

    /// Path to the molecule file (TOML with one [[molecule]] table per molecule).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub molecules: PathBuf,

    /// Directory the topology files are written to.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Path to an optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Generation Overrides ---
    /// Level of theory to take geometries and charges from.
    #[arg(short, long, value_name = "NAME")]
    pub level_of_theory: Option<String>,

    /// Charge model: 'zero', 'esp' or the name of tagged charges (e.g. 'mulliken').
    #[arg(long, value_name = "MODEL")]
    pub charge_model: Option<String>,

    /// Number of bonds over which nonbonded interactions are excluded.
    #[arg(long, value_name = "INT")]
    pub nrexcl: Option<usize>,

    /// Override `generation.add-shells` from the config file.
    #[command(flatten)]
    pub shells: ShellFlags,

    /// Replace planar and linear centres by virtual sites.
    #[arg(long)]
    pub vsites: bool,

    // --- Output Overrides ---
    /// Topology format: 'top' for a complete topology, 'itp' for an include file.
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Also write the conformation of each molecule as a .gro file.
    #[arg(long)]
    pub gro: bool,

    /// Annotate topology files with a summary of every section.
    #[arg(long)]
    pub annotate: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S generation.nrexcl=2
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// A group to handle mutually exclusive boolean flags for polarizable shells.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct ShellFlags {
    /// Add a polarizable shell to every atom whose type has a polarizability.
    #[arg(long)]
    pub shells: bool,
    /// Never add polarizable shells.
    #[arg(long)]
    pub no_shells: bool,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the force-field parameter file (TOML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub forcefield: PathBuf,

    /// Path to a molecule file whose types are checked against the force field.
    #[arg(short, long, value_name = "PATH")]
    pub molecules: Option<PathBuf>,
}
