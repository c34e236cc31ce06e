//! synthform CLI: construct trees to declarative infrastructure templates.

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "synthform",
    version,
    about = "Construct trees to declarative infrastructure templates: deterministic logical IDs, lazy tokens, structural assertions"
)]
struct Cli {
    #[command(subcommand)]
    command: synthform::cli::Commands,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = synthform::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
