use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::check::CheckArgs;
use commands::extract::ExtractArgs;

#[derive(Parser, Debug)]
#[command(name = "veil", version, about = "Column-level SQL sensitivity analysis")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report which columns of a query carry sensitive data.
    Extract(ExtractArgs),

    /// Validate a catalog file for duplicate or unresolvable entries.
    Check(CheckArgs),
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `extract` output stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Extract(args) => commands::extract::run(&args)?,
        Command::Check(args) => commands::check::run(&args)?,
    }

    Ok(())
}
