use crate::demo::{run_catalog, run_demo, run_sweep, CatalogArgs, DemoArgs, SweepArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use docket::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "docket",
    about = "Run the regulatory case desk and its automation sweeps",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service and the automation scheduler (default command)
    Serve(ServeArgs),
    /// Run a single automation tick against a seeded in-memory desk
    Sweep(SweepArgs),
    /// List catalog procedures, optionally from a CSV export
    Catalog(CatalogArgs),
    /// Walk a case from opening to renewal with a simulated clock
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the automation tick period in seconds
    #[arg(long)]
    pub(crate) interval_secs: Option<u64>,
    /// Load procedures from a CSV export instead of the built-in catalog
    #[arg(long)]
    pub(crate) catalog_csv: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Sweep(args) => run_sweep(args),
        Command::Catalog(args) => run_catalog(args),
        Command::Demo(args) => run_demo(args),
    }
}
