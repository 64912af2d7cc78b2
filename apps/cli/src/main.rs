//! fieldsync CLI: mirror time-tracking clients and projects into ticket
//! field dropdowns.
//!
//! Meant to be run on a schedule; a failed sync exits non-zero.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
