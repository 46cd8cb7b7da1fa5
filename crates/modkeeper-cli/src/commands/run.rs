//! `modkeeper run` command implementation
//!
//! Reads console commands from stdin. `reload` and SIGHUP trigger a reload,
//! `status` prints the report, and `stop`, Ctrl-C or end of input shut down.

use crate::CliError;
use crate::context::CliContext;
use crate::output::{self, OutputFormat};
use colored::Colorize;
use modkeeper_core::Coordinator;
use modkeeper_core::config::CoreConfig;
use tokio::io::{AsyncBufReadExt, BufReader};

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Reload,
    Status,
    Stop,
    Help,
    Empty,
    Unknown(String),
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "reload" => Self::Reload,
            "status" => Self::Status,
            "stop" | "exit" | "quit" => Self::Stop,
            "help" | "?" => Self::Help,
            other => Self::Unknown(other.to_string()),
        }
    }
}

#[cfg(unix)]
struct Hangup(tokio::signal::unix::Signal);

#[cfg(unix)]
impl Hangup {
    fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        Ok(Self(signal(SignalKind::hangup())?))
    }

    async fn recv(&mut self) {
        if self.0.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
struct Hangup;

#[cfg(not(unix))]
impl Hangup {
    fn new() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) {
        std::future::pending::<()>().await;
    }
}

/// Execute the `modkeeper run` command
pub async fn run(ctx: &CliContext, initial: Option<&CoreConfig>) -> Result<(), CliError> {
    let coordinator = ctx.coordinator(initial);
    let outcome = coordinator.start().await;
    output::print_outcome("startup", &outcome);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut hangup = Hangup::new()?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::debug!("stdin closed");
                    break;
                };
                if !dispatch(&coordinator, ConsoleCommand::parse(&line)).await? {
                    break;
                }
            }
            _ = hangup.recv() => {
                tracing::info!("SIGHUP received, reloading");
                output::print_outcome("reload", &coordinator.reload().await);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    coordinator.shutdown().await;
    println!("{} stopped", "✓".green());
    Ok(())
}

/// Returns `false` once the console asked to stop
async fn dispatch(coordinator: &Coordinator, command: ConsoleCommand) -> Result<bool, CliError> {
    match command {
        ConsoleCommand::Reload => {
            output::print_outcome("reload", &coordinator.reload().await);
        }
        ConsoleCommand::Status => {
            let report = coordinator.report().await;
            println!("{}", output::render_report(&report, OutputFormat::Text)?);
        }
        ConsoleCommand::Stop => return Ok(false),
        ConsoleCommand::Help => {
            println!("commands: reload, status, stop");
        }
        ConsoleCommand::Empty => {}
        ConsoleCommand::Unknown(other) => {
            println!("{} unknown command '{}', try 'help'", "!".yellow(), other);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_console_commands() {
        assert_eq!(ConsoleCommand::parse("reload"), ConsoleCommand::Reload);
        assert_eq!(ConsoleCommand::parse("  STATUS \n"), ConsoleCommand::Status);
        assert_eq!(ConsoleCommand::parse("quit"), ConsoleCommand::Stop);
        assert_eq!(ConsoleCommand::parse(""), ConsoleCommand::Empty);
        assert_eq!(
            ConsoleCommand::parse("restart"),
            ConsoleCommand::Unknown("restart".to_string())
        );
    }
}
