use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use scout_core::{SettingsError, TargetError, Termination};

use crate::persist::PersistError;

/// Opaque continuation token handed out by the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of search results. A missing cursor means upstream is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<I> {
    pub items: Vec<I>,
    pub cursor: Option<PageCursor>,
}

impl<I> Page<I> {
    pub fn new(items: Vec<I>, cursor: Option<PageCursor>) -> Self {
        Self { items, cursor }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Top,
    Latest,
}

impl SortMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Top => "Top",
            SortMode::Latest => "Latest",
        }
    }
}

/// Observational progress notifications; never part of a run's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeEvent {
    RunStarted { keyword: String, output_path: PathBuf },
    PageFetched { page: usize, items: usize },
    ItemSkipped { reason: String },
    BatchFlushed { rows: usize, persisted: usize },
    Cooldown { remaining: Duration },
    Exhausted { collected: usize },
    RunFinished { collected: usize, persisted: usize },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ScrapeEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: ScrapeEvent) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError {
    pub kind: FailureKind,
    pub message: String,
}

impl UpstreamError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for UpstreamError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    MalformedResponse,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::MalformedResponse => write!(f, "malformed response"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("item has no id")]
    MissingId,
    #[error("item {id} has no author")]
    MissingAuthor { id: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("authentication error: {0}")]
    Authentication(String),
    #[error("upstream request error: {0}")]
    Upstream(#[from] UpstreamError),
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

impl From<SettingsError> for ScrapeError {
    fn from(err: SettingsError) -> Self {
        ScrapeError::Configuration(err.to_string())
    }
}

impl From<TargetError> for ScrapeError {
    fn from(err: TargetError) -> Self {
        ScrapeError::Configuration(err.to_string())
    }
}

/// Outcome of one pagination run.
///
/// `persisted` counts the complete rows in the output file below the header.
/// It equals `collected` unless a flush failed and could not be repeated.
#[derive(Debug)]
pub struct RunReport {
    pub keyword: String,
    pub collected: usize,
    pub persisted: usize,
    pub skipped: usize,
    pub pages: usize,
    pub output_path: PathBuf,
    pub termination: Termination,
    pub error: Option<ScrapeError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.termination != Termination::Failed
    }
}
