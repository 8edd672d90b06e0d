use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tally_types::Category;

#[derive(Parser)]
#[command(
    name = "tally",
    about = "Tally inventory console: inspect records, audit trail, and access rules",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file with `[store]` settings and `[[allowlist]]` rules
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON file mapping category names to arrays of records
    #[arg(short, long, global = true)]
    pub seed: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the records of a category in order
    List(CategoryArgs),
    /// Print a category as tab-separated rows
    Export(CategoryArgs),
    /// Show the audit trail and verify its hash chain
    Audit,
    /// Check whether an address passes the allowlist
    CheckIp(CheckIpArgs),
    /// Show which records of one category link to another
    Matrix(MatrixArgs),
}

#[derive(Args)]
pub struct CategoryArgs {
    /// address, person, or system
    pub category: Category,
}

#[derive(Args)]
pub struct CheckIpArgs {
    pub address: String,
}

#[derive(Args)]
pub struct MatrixArgs {
    pub from: Category,
    pub to: Category,
}
