//! Porthole CLI - Command-line interface
//!
//! Serves the videos of a recording session to the browser viewer.

mod commands;

use clap::Parser;
use porthole_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "porthole")]
#[command(about = "Serve session videos to a browser viewer")]
struct Cli {
    /// Console log verbosity
    #[arg(long, value_enum, default_value_t = CliLogLevel::Info)]
    log_level: CliLogLevel,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_tracing_level(), None)?;
    commands::handle_command(cli.command).await?;

    Ok(())
}
