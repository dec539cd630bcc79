//! Command-line interface definition.

use std::path::PathBuf;

use chrono::TimeDelta;
use clap::Parser;

/// gcalcsv - Export Google Calendar events as CSV
///
/// Writes one `start,summary` row per event to standard output. Logs and the
/// authorization prompt go to standard error.
#[derive(Debug, Parser)]
#[command(name = "gcalcsv")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "GCALCSV_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    // --- Window flags ---
    /// Window start as RFC3339 (defaults to now)
    #[arg(long)]
    pub start: Option<String>,

    /// Window end as RFC3339 (defaults to now)
    #[arg(long)]
    pub end: Option<String>,

    /// Duration subtracted from the start, e.g. 24h, 1h30m, 2d
    #[arg(long, value_parser = parse_offset, allow_hyphen_values = true)]
    pub from: Option<TimeDelta>,

    /// Duration added to the end, e.g. 168h, 1w
    #[arg(long, value_parser = parse_offset, allow_hyphen_values = true)]
    pub to: Option<TimeDelta>,

    // --- Output flags ---
    /// Maximum number of rows to write, 0 for no limit [default: 250]
    #[arg(long)]
    pub limit: Option<usize>,

    // --- Google flags ---
    /// OAuth client secret file from the Google Cloud Console [default: credentials.json]
    #[arg(long, env = "GCALCSV_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Cached credential file [default: token.json]
    #[arg(long, env = "GCALCSV_TOKEN")]
    pub token: Option<PathBuf>,

    /// Calendar to read [default: primary]
    #[arg(long)]
    pub calendar: Option<String>,

    /// Fetch deadline in seconds [default: 10]
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Do not try to open the authorization page in a browser
    #[arg(long)]
    pub no_browser: bool,
}

fn parse_offset(value: &str) -> Result<TimeDelta, String> {
    gcalcsv_core::parse_signed_duration(value).map_err(|e| e.to_string())
}
