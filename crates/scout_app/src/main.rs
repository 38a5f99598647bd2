mod cli;
mod config;
mod progress;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use log::LevelFilter;
use scout_engine::{
    ensure_output_dir, output_filename, BatchWriter, HttpSessionProvider, PaginationDriver,
    PostExtractor, RateLimiter, RunReport, SessionProvider,
};
use scout_logging::{scout_error, scout_info, scout_warn, LogDestination};
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::progress::LogProgressSink;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; the process environment still applies.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let destination = match &cli.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    scout_logging::initialize(destination, LevelFilter::Info);

    match run(cli).await {
        Ok(report) => {
            print_report(&report);
            if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(err) => {
            scout_error!("{:#}", err);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<RunReport> {
    let config = AppConfig::from_process_env(cli).context("invalid configuration")?;

    let provider = HttpSessionProvider::new(
        config.fetch.clone(),
        config.credentials.clone(),
        config.session_file.clone(),
    );
    let client = provider
        .establish()
        .await
        .context("could not establish a session")?;

    ensure_output_dir(&config.output_dir)
        .with_context(|| format!("could not prepare {:?}", config.output_dir))?;
    let filename = output_filename(config.target.keyword(), Local::now().naive_local());
    let writer = BatchWriter::create(config.output_dir.join(filename), config.batch_size)?;
    let limiter = RateLimiter::new(config.rate_limit)?;

    let cancel = CancellationToken::new();
    spawn_interrupt_watcher(cancel.clone());

    let driver = PaginationDriver::new(client, PostExtractor, limiter, writer)
        .with_progress(Arc::new(LogProgressSink))
        .with_cancellation(cancel)
        .with_retry(config.retry);
    Ok(driver.run(&config.target).await)
}

fn spawn_interrupt_watcher(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                scout_warn!("Interrupted; saving collected posts and stopping");
                cancel.cancel();
            }
            Err(err) => scout_warn!("Could not listen for Ctrl-C: {}", err),
        }
    });
}

fn print_report(report: &RunReport) {
    match &report.error {
        Some(err) => scout_error!(
            "Search for '{}' stopped: {}. {} posts saved to {:?}",
            report.keyword,
            err,
            report.persisted,
            report.output_path
        ),
        None => scout_info!(
            "Search for '{}' finished ({:?}): {} posts saved to {:?}, {} skipped over {} pages",
            report.keyword,
            report.termination,
            report.persisted,
            report.output_path,
            report.skipped,
            report.pages
        ),
    }
}
