//! Terminal output for sensorctl. ASCII only.

use anyhow::Result;
use owo_colors::OwoColorize;
use sensor_common::{MergedTable, ProbeReport, ProbeStatus, StatusSummary};

fn colored_status(label: &str, width: usize) -> String {
    let padded = format!("{:<width$}", label, width = width);
    match label {
        "Good" => padded.bright_green().to_string(),
        "Bad" => padded.bright_red().to_string(),
        "No Link" => padded.yellow().to_string(),
        _ => padded.dimmed().to_string(),
    }
}

/// Merged table with aligned columns; the status column is colored
pub fn display_table(table: &MergedTable) {
    let rows: Vec<Vec<String>> = table.rows.iter().map(|r| table.cells(r)).collect();
    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    println!();
    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<w$}", c, w = *w))
        .collect();
    println!("{}", header.join("  ").bold());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("{}", rule.join("  ").dimmed());

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&table.columns)
            .zip(&widths)
            .map(|((cell, column), w)| {
                if *column == table.status_column {
                    colored_status(cell, *w)
                } else {
                    format!("{:<w$}", cell, w = *w)
                }
            })
            .collect();
        println!("{}", cells.join("  "));
    }
}

pub fn display_summary(summary: &StatusSummary, shown: usize) {
    println!();
    println!(
        "[SUMMARY] {} sensors, {} shown: {} good, {} bad, {} no link",
        summary.total,
        shown,
        summary.good.to_string().bright_green(),
        summary.bad.to_string().bright_red(),
        summary.no_link.to_string().yellow()
    );
    println!();
}

pub fn display_report(url: &str, report: &ProbeReport) {
    let tag = match report.status {
        ProbeStatus::Good => "[GOOD]   ".bright_green().to_string(),
        ProbeStatus::Bad => "[BAD]    ".bright_red().to_string(),
        ProbeStatus::NoLink => "[NO LINK]".yellow().to_string(),
    };
    match &report.failure {
        Some(failure) => println!(
            "{} {} ({}, {} ms)",
            tag,
            url,
            failure.as_str().dimmed(),
            report.elapsed_ms
        ),
        None => println!("{} {} ({} ms)", tag, url, report.elapsed_ms),
    }
}

/// `{"columns": [...], "rows": [[...]]}` keeping the sheet's column order
pub fn print_json(table: &MergedTable) -> Result<()> {
    let rows: Vec<Vec<String>> = table.rows.iter().map(|r| table.cells(r)).collect();
    let value = serde_json::json!({
        "columns": table.columns,
        "status_column": table.status_column,
        "rows": rows,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
