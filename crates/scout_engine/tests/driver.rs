use std::collections::{HashSet, VecDeque};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use scout_core::{RateLimitSettings, RunTarget, Termination};
use scout_engine::{
    BatchSink, BatchWriter, FailureKind, PersistError, Page, PageCursor, PaginationDriver, PostAuthor, PostExtractor,
    PostItem, ProgressSink, RateLimiter, RetryPolicy, ScrapeError, ScrapeEvent, SearchClient,
    SortMode, UpstreamError,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

type Reply = Result<Page<PostItem>, UpstreamError>;

/// Serves canned pages in order and records every call.
struct ScriptedClient {
    replies: Mutex<VecDeque<Reply>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn next_reply(&self) -> Reply {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Page::new(Vec::new(), None)))
    }
}

#[async_trait::async_trait]
impl SearchClient for ScriptedClient {
    type Item = PostItem;

    async fn search(&self, keyword: &str, sort: SortMode) -> Reply {
        self.calls
            .lock()
            .unwrap()
            .push(format!("search:{keyword}:{}", sort.as_str()));
        self.next_reply()
    }

    async fn next_page(&self, cursor: &PageCursor) -> Reply {
        self.calls
            .lock()
            .unwrap()
            .push(format!("next:{}", cursor.as_str()));
        self.next_reply()
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<ScrapeEvent>>,
}

impl RecordingSink {
    fn flushes(&self) -> Vec<usize> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                ScrapeEvent::BatchFlushed { rows, .. } => Some(*rows),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ScrapeEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// In-memory output whose chosen appends fail after writing half their bytes.
#[derive(Clone, Default)]
struct FlakyStore {
    bytes: Arc<Mutex<Vec<u8>>>,
    appends: Arc<Mutex<usize>>,
    failing: HashSet<usize>,
}

impl FlakyStore {
    /// Appends are numbered from 0, the header being append 0.
    fn failing_on(appends: impl IntoIterator<Item = usize>) -> Self {
        Self {
            failing: appends.into_iter().collect(),
            ..Self::default()
        }
    }

    fn ids(&self) -> Vec<String> {
        let bytes = self.bytes.lock().unwrap().clone();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        reader
            .records()
            .map(|row| row.unwrap()[0].to_string())
            .collect()
    }
}

impl BatchSink for FlakyStore {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut count = self.appends.lock().unwrap();
        let index = *count;
        *count += 1;
        let mut stored = self.bytes.lock().unwrap();
        if self.failing.contains(&index) {
            stored.extend_from_slice(&bytes[..bytes.len() / 2]);
            return Err(io::Error::other("disk full"));
        }
        stored.extend_from_slice(bytes);
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.bytes.lock().unwrap().truncate(len as usize);
        Ok(())
    }
}

fn post(id: usize) -> PostItem {
    PostItem {
        id: Some(id.to_string()),
        text: format!("post {id}"),
        user: Some(PostAuthor {
            id: "1".to_string(),
            name: Some("author".to_string()),
        }),
        ..PostItem::default()
    }
}

fn page(ids: std::ops::Range<usize>, cursor: Option<&str>) -> Reply {
    Ok(Page::new(ids.map(post).collect(), cursor.map(PageCursor::new)))
}

fn quick_limiter() -> RateLimiter {
    RateLimiter::new(RateLimitSettings {
        max_requests_per_window: 1000,
        window_length: Duration::from_secs(900),
        min_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    })
    .unwrap()
}

fn driver(
    client: ScriptedClient,
    dir: &TempDir,
    sink: Arc<RecordingSink>,
) -> PaginationDriver<ScriptedClient, PostExtractor> {
    let writer = BatchWriter::create(dir.path().join("out.csv"), 20).unwrap();
    PaginationDriver::new(client, PostExtractor, quick_limiter(), writer).with_progress(sink)
}

fn store_driver(
    client: ScriptedClient,
    store: &FlakyStore,
    sink: Arc<RecordingSink>,
) -> PaginationDriver<ScriptedClient, PostExtractor> {
    let writer = BatchWriter::with_sink("memory.csv", Box::new(store.clone()), 20).unwrap();
    PaginationDriver::new(client, PostExtractor, quick_limiter(), writer).with_progress(sink)
}

fn written_ids(path: &Path) -> Vec<String> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .records()
        .map(|row| row.unwrap()[0].to_string())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn collects_exactly_the_target_across_pages() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let client = ScriptedClient::new(vec![
        page(0..20, Some("c1")),
        page(20..40, Some("c2")),
        page(40..50, Some("c3")),
    ]);
    let calls = client.calls.clone();
    let target = RunTarget::new("disaster", 45).unwrap();

    let report = driver(client, &dir, sink.clone()).run(&target).await;

    assert!(report.is_success());
    assert_eq!(report.termination, Termination::TargetReached);
    assert_eq!(report.collected, 45);
    assert_eq!(report.persisted, 45);
    assert_eq!(report.pages, 3);
    assert_eq!(sink.flushes(), vec![20, 20, 5]);
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["search:disaster:Top", "next:c1", "next:c2"]
    );

    let expected: Vec<String> = (0..45).map(|id| id.to_string()).collect();
    assert_eq!(written_ids(&report.output_path), expected);
}

#[tokio::test(start_paused = true)]
async fn exhaustion_returns_fewer_records_successfully() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let client = ScriptedClient::new(vec![page(0..20, Some("c1")), page(20..27, None)]);
    let target = RunTarget::new("quiet", 100).unwrap();

    let report = driver(client, &dir, sink.clone()).run(&target).await;

    assert!(report.is_success());
    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(report.collected, 27);
    assert_eq!(written_ids(&report.output_path).len(), 27);
    assert!(sink
        .events
        .lock()
        .unwrap()
        .contains(&ScrapeEvent::Exhausted { collected: 27 }));
}

#[tokio::test(start_paused = true)]
async fn upstream_failure_flushes_buffered_records() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let client = ScriptedClient::new(vec![
        page(0..20, Some("c1")),
        page(20..30, Some("c2")),
        Err(UpstreamError::new(FailureKind::HttpStatus(500), "boom")),
    ]);
    let target = RunTarget::new("storm", 100).unwrap();

    let report = driver(client, &dir, sink.clone()).run(&target).await;

    assert!(!report.is_success());
    assert_eq!(report.termination, Termination::Failed);
    assert!(matches!(report.error, Some(ScrapeError::Upstream(_))));
    assert_eq!(report.collected, 30);
    assert_eq!(report.persisted, 30);
    assert_eq!(sink.flushes(), vec![20, 10]);
    let expected: Vec<String> = (0..30).map(|id| id.to_string()).collect();
    assert_eq!(written_ids(&report.output_path), expected);
}

#[tokio::test(start_paused = true)]
async fn malformed_items_are_skipped_and_counted() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let mut items: Vec<PostItem> = (0..5).map(post).collect();
    items[1].id = None;
    items[3].user = None;
    let client = ScriptedClient::new(vec![Ok(Page::new(items, None))]);
    let target = RunTarget::new("mixed", 10).unwrap();

    let report = driver(client, &dir, sink).run(&target).await;

    assert!(report.is_success());
    assert_eq!(report.collected, 3);
    assert_eq!(report.skipped, 2);
    assert_eq!(written_ids(&report.output_path), vec!["0", "2", "4"]);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_when_enabled() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let client = ScriptedClient::new(vec![
        Err(UpstreamError::new(FailureKind::Timeout, "slow")),
        page(0..5, None),
    ]);
    let calls = client.calls.clone();
    let target = RunTarget::new("retry", 10).unwrap();

    let report = driver(client, &dir, sink)
        .with_retry(RetryPolicy::with_retries(2))
        .run(&target)
        .await;

    assert!(report.is_success());
    assert_eq!(report.collected, 5);
    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failures_abort_immediately_by_default() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let client = ScriptedClient::new(vec![
        Err(UpstreamError::new(FailureKind::Timeout, "slow")),
        page(0..5, None),
    ]);
    let calls = client.calls.clone();
    let target = RunTarget::new("retry", 10).unwrap();

    let report = driver(client, &dir, sink).run(&target).await;

    assert_eq!(report.termination, Termination::Failed);
    assert_eq!(report.collected, 0);
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(written_ids(&report.output_path), Vec::<String>::new());
}

#[tokio::test(start_paused = true)]
async fn cancelled_run_stops_before_next_request_and_keeps_records() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let client = ScriptedClient::new(vec![page(0..5, Some("c1")), page(5..10, None)]);
    let calls = client.calls.clone();
    let target = RunTarget::new("stop", 100).unwrap();
    let token = CancellationToken::new();

    let limiter = RateLimiter::new(RateLimitSettings {
        max_requests_per_window: 1,
        window_length: Duration::from_secs(900),
        min_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    })
    .unwrap();
    let writer = BatchWriter::create(dir.path().join("out.csv"), 20).unwrap();
    let driver = PaginationDriver::new(client, PostExtractor, limiter, writer)
        .with_progress(sink)
        .with_cancellation(token.clone());

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        canceller.cancel();
    });

    let report = driver.run(&target).await;

    assert!(report.is_success());
    assert_eq!(report.termination, Termination::Cancelled);
    assert_eq!(report.collected, 5);
    assert_eq!(report.persisted, 5);
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn storage_failure_stops_extraction_and_reports_rows_on_disk() {
    let sink = Arc::new(RecordingSink::default());
    let store = FlakyStore::failing_on(2..16);
    let client = ScriptedClient::new(vec![
        page(0..20, Some("c1")),
        page(20..50, Some("c2")),
        page(50..60, None),
    ]);
    let calls = client.calls.clone();
    let target = RunTarget::new("flood", 100).unwrap();

    let report = store_driver(client, &store, sink.clone()).run(&target).await;

    assert!(!report.is_success());
    assert_eq!(report.termination, Termination::Failed);
    assert!(matches!(
        report.error,
        Some(ScrapeError::Persist(PersistError::Io(_)))
    ));
    // The second batch fills at item 40 and extraction stops there.
    assert_eq!(report.collected, 40);
    assert_eq!(calls.lock().unwrap().len(), 2);
    assert_eq!(sink.flushes(), vec![20]);

    let expected: Vec<String> = (0..20).map(|id| id.to_string()).collect();
    assert_eq!(store.ids(), expected);
    assert_eq!(report.persisted, store.ids().len());
}

#[tokio::test(start_paused = true)]
async fn failed_batch_is_written_whole_by_the_final_flush() {
    let sink = Arc::new(RecordingSink::default());
    let store = FlakyStore::failing_on([2]);
    let client = ScriptedClient::new(vec![page(0..20, Some("c1")), page(20..50, None)]);
    let target = RunTarget::new("flood", 100).unwrap();

    let report = store_driver(client, &store, sink.clone()).run(&target).await;

    assert_eq!(report.termination, Termination::Failed);
    assert!(matches!(report.error, Some(ScrapeError::Persist(_))));
    assert_eq!(report.collected, 40);
    assert_eq!(report.persisted, 40);
    assert_eq!(sink.flushes(), vec![20, 20]);

    let expected: Vec<String> = (0..40).map(|id| id.to_string()).collect();
    assert_eq!(store.ids(), expected);
}
