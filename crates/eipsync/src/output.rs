//! Output formatting: table, JSON, YAML.
//!
//! Table uses `tabled`, structured formats serialize the report via serde.

use std::fmt::Write as _;
use std::io::{self, Write};

use tabled::{Table, Tabled, settings::Style};

use eipsync_core::{DiffRow, JobReport};

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Table rows ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DiffTableRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Changes")]
    changes: String,
}

impl From<&DiffRow> for DiffTableRow {
    fn from(row: &DiffRow) -> Self {
        let changes = row
            .changes
            .iter()
            .map(|(field, value)| format!("{field}={value:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            kind: row.kind.to_string(),
            action: row.action.to_string(),
            key: row.key.clone(),
            changes,
        }
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a job report in the chosen format.
pub fn render_report(format: OutputFormat, report: &JobReport) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(render_report_table(report)),
        OutputFormat::Json => render_json(report),
        OutputFormat::Yaml => render_yaml(report),
    }
}

/// Render any serializable value in a structured format. Table falls
/// back to the caller's detail text.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data),
        OutputFormat::Yaml => render_yaml(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_report_table(report: &JobReport) -> String {
    let mut out = String::new();
    let mode = if report.dry_run { " (dry run)" } else { "" };
    let _ = writeln!(out, "Run {}{mode}", report.run_id);
    let _ = writeln!(out, "Differences found: {}", report.differences);

    if !report.rows.is_empty() {
        let rows: Vec<DiffTableRow> = report.rows.iter().map(DiffTableRow::from).collect();
        let _ = writeln!(out, "{}", Table::new(rows).with(Style::rounded()));
    }
    if let Some(summary) = report.summary {
        let _ = writeln!(out, "Summary: {summary}");
    }
    out.trim_end().to_owned()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(data)?)
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_yaml::to_string(data)?)
}
