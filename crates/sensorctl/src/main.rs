//! Sensor Control - command-line probe runner
//!
//! Loads a sensor table, probes every endpoint and prints the merged view.

mod output;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sensor_common::sheet::{SheetClient, TableSource};
use sensor_common::{merge, Config, EndpointProber, FilterSelection, Table};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sensorctl")]
#[command(about = "Probe sensor endpoints from a sensor table", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the system config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maximum probes in flight
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Per-probe timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe every row of a sensor table and print the merged result
    Probe {
        /// Sheet URL or local CSV path (defaults to the configured table)
        #[arg(long)]
        source: Option<String>,

        /// Keep rows whose COLUMN is one of the values (e.g. "Floor=1,B1")
        #[arg(long = "filter", value_name = "COLUMN=V1,V2")]
        filters: Vec<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Probe individual URLs and show why each one passed or failed
    Check {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = effective_config(&cli)?;

    match cli.command {
        Commands::Probe { source, filters, json } => probe(&config, source, &filters, json).await,
        Commands::Check { urls } => check(&config, &urls).await,
        Commands::Config => {
            print!("{}", config.to_toml());
            Ok(())
        }
    }
}

fn effective_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::load(),
    };
    if let Some(workers) = cli.workers {
        config.probe.workers = workers;
    }
    if let Some(secs) = cli.timeout_secs {
        config.probe.timeout_secs = secs;
    }
    config.validate()?;
    Ok(config)
}

fn prober(config: &Config) -> Result<EndpointProber> {
    EndpointProber::http(Duration::from_secs(config.probe.timeout_secs), config.probe.workers)
        .context("Failed to build probe client")
}

/// `COLUMN=V1,V2` → (column, values). An empty value list is allowed and
/// rejects every row.
fn parse_filter(arg: &str) -> Result<(String, Vec<String>)> {
    let Some((column, values)) = arg.split_once('=') else {
        bail!("Filter '{}' must look like COLUMN=V1,V2", arg);
    };
    let column = column.trim();
    if column.is_empty() {
        bail!("Filter '{}' has no column name", arg);
    }
    let values = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    Ok((column.to_string(), values))
}

fn selection_from_args(args: &[String]) -> Result<FilterSelection> {
    let mut selection = FilterSelection::new();
    for arg in args {
        let (column, values) = parse_filter(arg)?;
        selection.set(&column, values);
    }
    Ok(selection)
}

async fn probe(config: &Config, source: Option<String>, filters: &[String], json: bool) -> Result<()> {
    let selection = selection_from_args(filters)?;
    let source = TableSource::parse(source.as_deref().unwrap_or(&config.sources.sensor_table_url));

    let sheets = SheetClient::new(Duration::from_secs(config.sources.fetch_timeout_secs))
        .context("Failed to build sheet client")?;
    let table = sheets.load_table(&source, &config.probe.url_column).await;
    if !has_rows(&table, &source) {
        return Ok(());
    }

    let results = prober(config)?.probe_all(&table.probe_targets()).await;
    let merged = merge(&table, Some(&results), &config.probe.status_column)?;
    let shown = merged.filter(&selection);

    if json {
        output::print_json(&shown)?;
    } else {
        output::display_table(&shown);
        output::display_summary(&merged.summary(), shown.len());
    }
    Ok(())
}

/// Nothing to probe; the loader has already logged why
fn has_rows(table: &Table, source: &TableSource) -> bool {
    if table.is_empty() {
        warn!("No sensor rows loaded from {}", source.describe());
        return false;
    }
    true
}

async fn check(config: &Config, urls: &[String]) -> Result<()> {
    let reports = prober(config)?.probe_reports(urls).await;
    for (url, report) in urls.iter().zip(&reports) {
        output::display_report(url, report);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_common::SensorRecord;

    #[test]
    fn test_parse_filter() {
        let (column, values) = parse_filter("Floor=1, B1").unwrap();
        assert_eq!(column, "Floor");
        assert_eq!(values, vec!["1", "B1"]);
    }

    #[test]
    fn test_parse_filter_empty_values() {
        let (column, values) = parse_filter("getStatusAPI=").unwrap();
        assert_eq!(column, "getStatusAPI");
        assert!(values.is_empty());
    }

    #[test]
    fn test_parse_filter_rejects_malformed() {
        assert!(parse_filter("Floor").is_err());
        assert!(parse_filter("=Good").is_err());
    }

    #[test]
    fn test_repeated_filters_build_selection() {
        let args = vec!["Floor=1".to_string(), "getStatusAPI=Good,Bad".to_string()];
        let selection = selection_from_args(&args).unwrap();
        assert_eq!(selection.columns().collect::<Vec<_>>(), vec!["Floor", "getStatusAPI"]);
        assert_eq!(selection.get("getStatusAPI").unwrap().len(), 2);
    }

    #[test]
    fn test_has_rows() {
        let source = TableSource::parse("sensors.csv");
        assert!(!has_rows(&Table::empty(), &source));

        let table = Table::new(
            vec!["apiUrl".into()],
            vec![SensorRecord::from_fields([("apiUrl", "http://x/api")], "apiUrl")],
        );
        assert!(has_rows(&table, &source));
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "sensorctl",
            "probe",
            "--source",
            "sensors.csv",
            "--filter",
            "Floor=1",
            "--workers",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.workers, Some(5));
        match cli.command {
            Commands::Probe { source, filters, json } => {
                assert_eq!(source.as_deref(), Some("sensors.csv"));
                assert_eq!(filters, vec!["Floor=1"]);
                assert!(!json);
            }
            _ => panic!("expected probe"),
        }
    }
}
