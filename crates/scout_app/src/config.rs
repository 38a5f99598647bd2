//! Run configuration assembled from CLI flags and the environment.

use std::path::PathBuf;

use scout_core::{RateLimitSettings, RunTarget};
use scout_engine::{Credentials, FetchSettings, RetryPolicy, ScrapeError};

use crate::cli::Cli;

pub const ENV_AUTH_INFO_1: &str = "SCOUT_AUTH_INFO_1";
pub const ENV_AUTH_INFO_2: &str = "SCOUT_AUTH_INFO_2";
pub const ENV_PASSWORD: &str = "SCOUT_PASSWORD";
pub const ENV_BASE_URL: &str = "SCOUT_BASE_URL";
pub const ENV_SESSION_FILE: &str = "SCOUT_SESSION_FILE";
pub const ENV_OUTPUT_DIR: &str = "SCOUT_OUTPUT_DIR";

const DEFAULT_SESSION_FILE: &str = "session.json";
const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub target: RunTarget,
    pub rate_limit: RateLimitSettings,
    pub batch_size: usize,
    pub retry: RetryPolicy,
    pub fetch: FetchSettings,
    pub credentials: Option<Credentials>,
    pub session_file: PathBuf,
    pub output_dir: PathBuf,
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_process_env(cli: Cli) -> Result<Self, ScrapeError> {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    /// Merge `cli` over the values returned by `lookup`, then validate.
    ///
    /// Blank environment values count as unset.
    pub fn resolve(cli: Cli, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ScrapeError> {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let target = RunTarget::new(cli.keyword, cli.max_records)?;

        let defaults = RateLimitSettings::default();
        let rate_limit = RateLimitSettings {
            max_requests_per_window: cli.max_requests.unwrap_or(defaults.max_requests_per_window),
            window_length: cli.window.unwrap_or(defaults.window_length),
            min_delay: cli.min_delay.unwrap_or(defaults.min_delay),
            max_delay: cli.max_delay.unwrap_or(defaults.max_delay),
        };
        rate_limit.validate()?;

        let fetch = match cli.base_url.or_else(|| env(ENV_BASE_URL)) {
            Some(base_url) => FetchSettings::with_base_url(base_url),
            None => FetchSettings::default(),
        };

        let parts = [
            env(ENV_AUTH_INFO_1),
            env(ENV_AUTH_INFO_2),
            env(ENV_PASSWORD),
        ];
        let credentials = match parts {
            [Some(auth_info_1), Some(auth_info_2), Some(password)] => {
                Some(Credentials::new(auth_info_1, auth_info_2, password))
            }
            _ => None,
        };

        Ok(Self {
            target,
            rate_limit,
            batch_size: cli.batch_size,
            retry: RetryPolicy::with_retries(cli.retries),
            fetch,
            credentials,
            session_file: env(ENV_SESSION_FILE)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE)),
            output_dir: cli
                .output_dir
                .or_else(|| env(ENV_OUTPUT_DIR).map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            log_file: cli.log_file,
        })
    }
}
