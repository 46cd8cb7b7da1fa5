//! `modkeeper status` command implementation
//!
//! Read-only: nothing is staged, loaded or connected. The live report of a
//! running host is the `status` console command of `modkeeper run`.

use crate::CliError;
use crate::context::CliContext;
use crate::output::{self, OutputFormat};
use modkeeper_core::config::CoreConfig;

/// Execute the `modkeeper status` command
pub async fn run(
    ctx: &CliContext,
    initial: Option<&CoreConfig>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let report = ctx.coordinator(initial).inspect().await;
    if let Some(error) = &report.config_error {
        tracing::warn!("Configuration unreadable, showing defaults: {}", error);
    }

    println!("{}", output::render_inspection(&report, format)?);
    Ok(())
}
