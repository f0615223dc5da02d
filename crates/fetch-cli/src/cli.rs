use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fetch_store::CollectionChangePolicy;

#[derive(Parser)]
#[command(
    name = "fetch",
    about = "Change-tracking repositories with partial updates",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add, update and delete a customer through the processor pipeline
    Demo(DemoArgs),
    /// Seed customers and print them page by page
    Paginate(PaginateArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct DemoArgs {
    /// How collection changes are persisted (overrides the config file)
    #[arg(long, value_enum)]
    pub collections: Option<PolicyArg>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum PolicyArg {
    Skip,
    Coarsen,
    Reject,
}

impl From<PolicyArg> for CollectionChangePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Skip => Self::Skip,
            PolicyArg::Coarsen => Self::Coarsen,
            PolicyArg::Reject => Self::Reject,
        }
    }
}

#[derive(Args)]
pub struct PaginateArgs {
    /// Number of customers to seed
    #[arg(long, default_value_t = 25)]
    pub count: usize,
    /// Rows per page
    #[arg(long, default_value_t = 10)]
    pub page_size: usize,
    /// Print only this page
    #[arg(long)]
    pub page: Option<usize>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Print the defaults instead of the loaded file
    #[arg(long)]
    pub defaults: bool,
}
