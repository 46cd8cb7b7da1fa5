//! modkeeper - host binary for the module lifecycle coordinator

mod cli;
mod commands;
mod context;
mod error;
mod output;

pub use error::CliError;

use clap::Parser;
use cli::{Cli, Commands};
use context::CliContext;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let ctx = CliContext::from_cli(&cli);

    let rt = tokio::runtime::Runtime::new()?;

    if !matches!(cli.command, Commands::Init) {
        ctx.ensure_config()?;
    }

    // Debug logging follows --verbose or `debug.enabled`; RUST_LOG overrides both
    let initial = rt.block_on(ctx.peek_config());
    let debug = cli.verbose || initial.as_ref().is_some_and(|c| c.debug.enabled);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = rt.block_on(async {
        match cli.command {
            Commands::Init => commands::init::run(&ctx)?,
            Commands::Run => commands::run::run(&ctx, initial.as_ref()).await?,
            Commands::Status { output } => {
                commands::status::run(&ctx, initial.as_ref(), output).await?
            }
        }
        Ok::<(), anyhow::Error>(())
    });

    // A pending stdin read would otherwise hold the blocking pool open
    rt.shutdown_timeout(Duration::from_secs(1));
    result
}
