use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use scout_core::DEFAULT_MAX_RECORDS;
use scout_engine::DEFAULT_BATCH_SIZE;

#[derive(Debug, Parser)]
#[command(
    name = "scout",
    disable_help_subcommand = true,
    about = "Collect posts matching a keyword into a CSV file",
    long_about = "Search posts for a keyword under a rate limit, paging until the target is reached or results run out, and append them to a timestamped CSV file in batches.",
    after_help = "Credentials are read from SCOUT_AUTH_INFO_1, SCOUT_AUTH_INFO_2 and SCOUT_PASSWORD (or a .env file) unless a cached session is available."
)]
pub struct Cli {
    #[arg(long, default_value = "disaster", help = "Keyword to search for")]
    pub keyword: String,
    #[arg(
        long = "max-records",
        default_value_t = DEFAULT_MAX_RECORDS,
        value_parser = parse_positive_usize,
        help = "Stop after collecting this many records"
    )]
    pub max_records: usize,
    #[arg(
        long = "batch-size",
        default_value_t = DEFAULT_BATCH_SIZE,
        value_parser = parse_positive_usize,
        help = "Rows buffered before each write to disk"
    )]
    pub batch_size: usize,
    #[arg(long = "max-requests", help = "Requests allowed per rate limit window")]
    pub max_requests: Option<u32>,
    #[arg(
        long = "window-secs",
        value_name = "SECONDS",
        value_parser = parse_seconds,
        help = "Length of the rate limit window"
    )]
    pub window: Option<Duration>,
    #[arg(
        long = "min-delay-secs",
        value_name = "SECONDS",
        value_parser = parse_seconds,
        help = "Lower bound of the random delay before each request"
    )]
    pub min_delay: Option<Duration>,
    #[arg(
        long = "max-delay-secs",
        value_name = "SECONDS",
        value_parser = parse_seconds,
        help = "Upper bound of the random delay before each request"
    )]
    pub max_delay: Option<Duration>,
    #[arg(
        long,
        default_value_t = 0,
        help = "Retries for a failed page request before the run stops"
    )]
    pub retries: u32,
    #[arg(long = "base-url", help = "Search API base URL (overrides SCOUT_BASE_URL)")]
    pub base_url: Option<String>,
    #[arg(
        long = "output-dir",
        value_name = "DIR",
        help = "Directory for CSV output (overrides SCOUT_OUTPUT_DIR)"
    )]
    pub output_dir: Option<PathBuf>,
    #[arg(
        long = "log-file",
        value_name = "PATH",
        help = "Also write the log to this file"
    )]
    pub log_file: Option<PathBuf>,
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let value: usize = raw
        .parse()
        .map_err(|_| format!("expected a positive integer, got '{raw}'"))?;
    if value == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(value)
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .parse()
        .map_err(|_| format!("expected a number of seconds, got '{raw}'"))?;
    Duration::try_from_secs_f64(secs).map_err(|err| format!("invalid duration '{raw}': {err}"))
}
