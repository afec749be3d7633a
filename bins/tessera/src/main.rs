mod cmd;

use clap::{Parser, Subcommand};
use cmd::inspect::InspectArgs;
use cmd::run::RunArgs;

#[derive(Parser)]
#[command(name = "tessera", about = "Columnar file round-trip verification")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write, read back and compare every scenario of a TOML file.
    Run(RunArgs),
    /// Print the schema and records of an existing file.
    Inspect(InspectArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Run(args) => cmd::run::run(args),
        Command::Inspect(args) => cmd::inspect::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
