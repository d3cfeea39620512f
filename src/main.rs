mod cleanup;
mod commands;
mod config;
mod context;
mod executor;
mod infrastructure;
mod output;
mod template;
mod traits;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use commands::{CleanCommand, ImportCommand, RulesCommand};
use context::Context;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tfimport")]
#[command(about = "Import existing Azure resources into Terraform and clean the generated configuration", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover resources, generate their configuration and clean it
    Import(ImportCommand),

    /// Clean generated configuration files in place
    Clean(CleanCommand),

    /// Show or validate cleanup rule tables
    Rules(RulesCommand),
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tfimport={}", default_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = Context::new();

    match cli.command {
        Commands::Import(cmd) => cmd.execute(&ctx)?,
        Commands::Clean(cmd) => cmd.execute(&ctx)?,
        Commands::Rules(cmd) => cmd.execute(&ctx)?,
    }

    Ok(())
}
