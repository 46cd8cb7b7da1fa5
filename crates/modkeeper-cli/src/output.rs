//! Output formatting for reports and reload outcomes

use colored::Colorize;
use comfy_table::{Cell, Color, Table};
use modkeeper_core::{InspectionReport, StatusReport};
use modkeeper_core::reload::ReloadOutcome;
use modkeeper_core::status::Status;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for automation
    Json,
    /// Table-formatted output
    Table,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Table => write!(f, "table"),
        }
    }
}

fn colored_status(status: Status) -> String {
    let text = status.to_string();
    match status {
        Status::Ok => text.green().to_string(),
        Status::Warning | Status::Loading => text.yellow().to_string(),
        Status::Error => text.red().to_string(),
        Status::Unknown => text.dimmed().to_string(),
    }
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Ok => Color::Green,
        Status::Warning | Status::Loading => Color::Yellow,
        Status::Error => Color::Red,
        Status::Unknown => Color::Grey,
    }
}

pub fn print_outcome(label: &str, outcome: &ReloadOutcome) {
    let verdict = if outcome.is_success() {
        "✓".green()
    } else {
        "✗".red()
    };
    println!("{} {} finished in {}ms", verdict, label, outcome.duration_ms);
    println!("  config:   {}", outcome.config);
    println!("  database: {}", outcome.store);
    println!("  modules:  {}", outcome.modules);
    for message in &outcome.messages {
        println!("  {} {}", "!".yellow(), message);
    }
}

pub fn render_report(report: &StatusReport, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report),
        OutputFormat::Table => Ok(report_table(report).to_string()),
        OutputFormat::Text => Ok(report_text(report)),
    }
}

fn report_text(report: &StatusReport) -> String {
    let mut out = String::new();
    let database = if report.database_connected {
        "connected".green()
    } else {
        "not connected".red()
    };
    out.push_str(&format!("{} {}\n", "Database:".bold(), database));
    out.push_str(&format!(
        "{} {} loaded, {}/{} components enabled\n",
        "Modules:".bold(),
        report.loaded_modules,
        report.enabled_count,
        report.total_count
    ));
    if report.debug {
        out.push_str(&format!("{} on\n", "Debug:".bold()));
    }
    for (key, entry) in &report.components {
        out.push_str(&format!("  {:<32} {}", key, colored_status(entry.status)));
        if let Some(message) = &entry.message {
            out.push_str(&format!(" ({})", message));
        }
        out.push('\n');
    }
    out
}

fn report_table(report: &StatusReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Component", "Version", "Status", "Message"]);

    for (key, entry) in &report.components {
        let version = report
            .records
            .iter()
            .find(|r| &r.identity == key)
            .map(|r| r.version.as_str())
            .unwrap_or("-");
        table.add_row(vec![
            Cell::new(key),
            Cell::new(version),
            Cell::new(entry.status).fg(status_color(entry.status)),
            Cell::new(entry.message.as_deref().unwrap_or("")),
        ]);
    }
    table
}

pub fn render_inspection(
    report: &InspectionReport,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report),
        OutputFormat::Table => Ok(inspection_table(report).to_string()),
        OutputFormat::Text => Ok(inspection_text(report)),
    }
}

fn inspection_text(report: &InspectionReport) -> String {
    let mut out = String::new();
    match &report.config_error {
        Some(error) => out.push_str(&format!("{} {}\n", "Config:".bold(), error.red())),
        None => out.push_str(&format!("{} {}\n", "Config:".bold(), "ok".green())),
    }
    let database = match &report.database {
        Some(target) => target.clone(),
        None => "disabled".to_string(),
    };
    out.push_str(&format!("{} {}\n", "Database:".bold(), database));
    out.push_str(&format!(
        "{} {} staged, {} pending\n",
        "Modules:".bold(),
        report.inventory.managed.len(),
        report.inventory.pending.len()
    ));
    for package in &report.inventory.managed {
        out.push_str(&format!(
            "  {:<32} {} {}",
            package.info.identity, package.info.display_name, package.info.version
        ));
        if let Some(problem) = &package.problem {
            out.push_str(&format!(" ({})", problem.red()));
        }
        out.push('\n');
    }
    for name in &report.inventory.pending {
        out.push_str(&format!("  {:<32} {}\n", name, "pending".yellow()));
    }
    for problem in &report.problems {
        out.push_str(&format!("{} {}\n", "!".yellow(), problem));
    }
    out
}

fn inspection_table(report: &InspectionReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Package", "Name", "Version", "State"]);

    for package in &report.inventory.managed {
        let state = match &package.problem {
            Some(problem) => Cell::new(problem).fg(Color::Red),
            None => Cell::new("staged").fg(Color::Green),
        };
        table.add_row(vec![
            Cell::new(&package.info.identity),
            Cell::new(&package.info.display_name),
            Cell::new(&package.info.version),
            state,
        ]);
    }
    for name in &report.inventory.pending {
        table.add_row(vec![
            Cell::new(name),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new("pending").fg(Color::Yellow),
        ]);
    }
    table
}
