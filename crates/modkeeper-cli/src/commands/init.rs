//! `modkeeper init` command implementation

use crate::CliError;
use crate::context::CliContext;
use colored::Colorize;
use modkeeper_core::config::write_default_config;

/// Execute the `modkeeper init` command
pub fn run(ctx: &CliContext) -> Result<(), CliError> {
    println!(
        "{} Initializing modkeeper in: {}",
        "→".green(),
        ctx.data_dir.display()
    );

    std::fs::create_dir_all(&ctx.inbound_dir)?;
    std::fs::create_dir_all(&ctx.managed_dir)?;

    if write_default_config(&ctx.config_path)? {
        println!("  Created: {}", ctx.config_path.display());
    } else {
        println!("  {} already exists", ctx.config_path.display());
    }

    println!("{} modkeeper initialized!", "✓".green());
    Ok(())
}
