use std::fmt::Write as _;
use std::fs::{OpenOptions, create_dir_all};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tablegraph_core::{AnomalyReport, ConstraintSummary, OrderReport};

use crate::{CliError, CliResult};

/// Write `data` next to `path` and rename it into place.
pub fn write_bytes_atomic(path: &Path, data: &[u8]) -> CliResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path(path)?;
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    std::fs::rename(&tmp_path, path)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            sync_dir(parent)?;
        }
    }

    Ok(())
}

fn temp_path(path: &Path) -> CliResult<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| CliError::Output(format!("{} has no file name", path.display())))?;
    let tmp_name = format!("{}.tmp", file_name.to_string_lossy());
    Ok(path.with_file_name(tmp_name))
}

fn sync_dir(path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(path)?;
    dir.sync_all()
}

/// Send rendered output to `out`, or stdout when absent.
pub fn emit(out: Option<&Path>, rendered: &str) -> CliResult<()> {
    match out {
        Some(path) => {
            write_bytes_atomic(path, rendered.as_bytes())?;
            tracing::info!(event = "report_written", path = %path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

pub fn describe(summary: &ConstraintSummary) -> String {
    format!(
        "{}.{} -> {}.{} ({})",
        summary.child_table,
        summary.child_columns.join(","),
        summary.parent_table,
        summary.parent_columns.join(","),
        summary.name
    )
}

fn section(out: &mut String, title: &str, lines: &[String]) {
    let _ = writeln!(out, "{title} ({}):", lines.len());
    for line in lines {
        let _ = writeln!(out, "  {line}");
    }
}

fn numbered(tables: &[String]) -> Vec<String> {
    tables
        .iter()
        .enumerate()
        .map(|(index, table)| format!("{:>3}. {table}", index + 1))
        .collect()
}

pub fn render_order_text(report: &OrderReport) -> String {
    let mut out = String::new();
    let summary = &report.summary;
    let _ = writeln!(
        out,
        "tables: {}  constraints: {}  implied: {}  recursive: {}",
        summary.tables, summary.constraints, summary.implied, summary.recursive
    );
    out.push('\n');
    section(&mut out, "insertion order", &numbered(&report.insertion_order));
    section(&mut out, "deletion order", &numbered(&report.deletion_order));
    if !report.skipped_remote.is_empty() {
        section(&mut out, "skipped remote tables", &report.skipped_remote);
    }
    let recursive: Vec<String> = report.recursive_constraints.iter().map(describe).collect();
    section(&mut out, "recursive constraints", &recursive);
    let implied: Vec<String> = report.implied_constraints.iter().map(describe).collect();
    section(&mut out, "implied constraints", &implied);
    out
}

pub fn render_constraints_text(constraints: &[ConstraintSummary]) -> String {
    let mut out = String::new();
    for constraint in constraints {
        let _ = writeln!(out, "{}", describe(constraint));
    }
    out
}

pub fn render_anomalies_text(report: &AnomalyReport) -> String {
    let mut out = String::new();
    section(&mut out, "orphan tables", &report.orphan_tables);
    section(&mut out, "tables with one column", &report.tables_with_one_column);
    section(
        &mut out,
        "tables with incrementing column names",
        &report.tables_with_incrementing_column_names,
    );
    let null_strings: Vec<String> = report
        .default_null_string_columns
        .iter()
        .map(|column| format!("{}.{}", column.table, column.column))
        .collect();
    section(&mut out, "columns defaulting to the string 'null'", &null_strings);
    let implied: Vec<String> = report.implied_constraints.iter().map(describe).collect();
    section(&mut out, "implied constraints", &implied);
    out
}

pub fn to_json<T: serde::Serialize>(value: &T) -> CliResult<String> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}
