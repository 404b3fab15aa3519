use crate::commands::{run_scan, run_seed_check, ScanArgs, SeedCheckArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use wellscan::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "wellscan",
    about = "Score scanned pantry items against food category wellness rules",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Resolve and score a single product code, printing the result as JSON
    Scan(ScanArgs),
    /// Validate a seed directory and report what it would load
    SeedCheck(SeedCheckArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Scan(args) => run_scan(args).await,
        Command::SeedCheck(args) => run_seed_check(args),
    }
}
