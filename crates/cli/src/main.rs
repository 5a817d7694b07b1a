mod cmd;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::{LoadArgs, cmd_load, cmd_tree};

/// broc - concurrent build descriptor loader
#[derive(Parser)]
#[command(name = "broc")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Load every descriptor reachable from the given modules and print a summary
  Load(LoadArgs),

  /// Load descriptors and print the environment tree of each module
  Tree(LoadArgs),
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  // RUST_LOG wins; otherwise -v turns on loader debug output
  let default_filter = if cli.verbose { "broc=debug,broc_lib=debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Load(args) => cmd_load(&args, cli.verbose),
    Commands::Tree(args) => cmd_tree(&args, cli.verbose),
  }
}
