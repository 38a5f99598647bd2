use std::collections::VecDeque;
use std::sync::Arc;

use scout_core::{update, Effect, Msg, PageRequest, Phase, RunState, RunTarget, Termination};
use scout_logging::{scout_error, scout_info, scout_warn};
use tokio_util::sync::CancellationToken;

use crate::extract::RecordExtractor;
use crate::fetch::SearchClient;
use crate::limiter::RateLimiter;
use crate::retry::RetryPolicy;
use crate::writer::BatchWriter;
use crate::{
    NullProgressSink, Page, PageCursor, ProgressSink, RunReport, ScrapeError, ScrapeEvent,
    SortMode, UpstreamError,
};

enum FetchFailure {
    Cancelled,
    Upstream(UpstreamError),
}

/// Runs one keyword search: rate-limited page fetches feeding extraction and
/// batched persistence, strictly one request at a time.
pub struct PaginationDriver<C, E> {
    client: C,
    extractor: E,
    limiter: RateLimiter,
    writer: BatchWriter,
    sink: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
    retry: RetryPolicy,
    sort: SortMode,
}

impl<C, E> PaginationDriver<C, E>
where
    C: SearchClient,
    E: RecordExtractor<C::Item>,
{
    pub fn new(client: C, extractor: E, limiter: RateLimiter, writer: BatchWriter) -> Self {
        let mut driver = Self {
            client,
            extractor,
            limiter,
            writer,
            sink: Arc::new(NullProgressSink),
            cancel: CancellationToken::new(),
            retry: RetryPolicy::default(),
            sort: SortMode::Top,
        };
        driver.wire_limiter();
        driver
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self.wire_limiter();
        self
    }

    /// Stop at the next loop iteration or rate-limit wait once `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self.wire_limiter();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    fn wire_limiter(&mut self) {
        self.limiter.attach(self.cancel.clone(), self.sink.clone());
    }

    /// Collect up to `target.max_records()` records.
    ///
    /// Never loses buffered records: every termination path, including
    /// upstream failure, flushes before the report is returned.
    pub async fn run(mut self, target: &RunTarget) -> RunReport {
        let mut state = RunState::new(target.max_records());
        let mut queue = VecDeque::new();
        let mut page: Option<Page<C::Item>> = None;
        let mut cursor: Option<PageCursor> = None;
        let mut error: Option<ScrapeError> = None;

        scout_info!(
            "Searching for posts containing '{}' into {:?}",
            target.keyword(),
            self.writer.path()
        );
        self.sink.emit(ScrapeEvent::RunStarted {
            keyword: target.keyword().to_string(),
            output_path: self.writer.path().to_path_buf(),
        });
        dispatch(&mut state, &mut queue, Msg::Start);

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::AcquireAndFetch(request) => {
                    let outcome = self.fetch(target.keyword(), request, cursor.as_ref()).await;
                    let msg = match outcome {
                        Ok(fetched) => {
                            let items = fetched.items.len();
                            cursor = fetched.cursor.clone();
                            self.sink.emit(ScrapeEvent::PageFetched {
                                page: state.pages() + 1,
                                items,
                            });
                            page = Some(fetched);
                            Msg::PageReceived {
                                items,
                                has_cursor: cursor.is_some(),
                            }
                        }
                        Err(FetchFailure::Cancelled) => {
                            scout_warn!("Search cancelled");
                            Msg::Cancelled
                        }
                        Err(FetchFailure::Upstream(err)) => {
                            scout_error!("Error during search: {}", err);
                            error = Some(err.into());
                            Msg::Failed
                        }
                    };
                    dispatch(&mut state, &mut queue, msg);
                }
                Effect::ExtractItems => {
                    let items = page.take().map(|p| p.items).unwrap_or_default();
                    for item in &items {
                        let msg = match self.extractor.extract(item) {
                            Ok(record) => {
                                self.writer.append(record);
                                Msg::ItemCollected
                            }
                            Err(err) => {
                                scout_warn!("Skipping malformed item: {}", err);
                                self.sink.emit(ScrapeEvent::ItemSkipped {
                                    reason: err.to_string(),
                                });
                                Msg::ItemSkipped
                            }
                        };
                        dispatch(&mut state, &mut queue, msg);

                        if self.writer.is_due() {
                            if let Err(err) = self.flush_batch(state.collected()) {
                                scout_error!("Failed to save batch: {}", err);
                                error = Some(err);
                                dispatch(&mut state, &mut queue, Msg::Failed);
                            }
                        }
                        if state.phase() != Phase::Extracting {
                            break;
                        }
                    }
                    if state.phase() == Phase::Extracting {
                        dispatch(&mut state, &mut queue, Msg::PageProcessed);
                    }
                }
                Effect::Finish(termination) => {
                    if termination == Termination::Exhausted {
                        scout_info!("No more posts available");
                        self.sink.emit(ScrapeEvent::Exhausted {
                            collected: state.collected(),
                        });
                    }
                    if let Err(err) = self.flush_batch(state.collected()) {
                        scout_error!("Failed to save final batch: {}", err);
                        error.get_or_insert(err);
                    }
                    break;
                }
            }
        }

        let termination = match (&error, state.termination()) {
            (Some(_), _) | (None, None) => Termination::Failed,
            (None, Some(termination)) => termination,
        };
        let persisted = self.writer.persisted();
        scout_info!(
            "Completed! Total collected: {} ({} saved to {:?})",
            state.collected(),
            persisted,
            self.writer.path()
        );
        self.sink.emit(ScrapeEvent::RunFinished {
            collected: state.collected(),
            persisted,
        });

        RunReport {
            keyword: target.keyword().to_string(),
            collected: state.collected(),
            persisted,
            skipped: state.skipped(),
            pages: state.pages(),
            output_path: self.writer.path().to_path_buf(),
            termination,
            error,
        }
    }

    async fn fetch(
        &mut self,
        keyword: &str,
        request: PageRequest,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<C::Item>, FetchFailure> {
        let mut attempt = 0u32;
        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchFailure::Cancelled);
            }
            self.limiter
                .acquire()
                .await
                .map_err(|_| FetchFailure::Cancelled)?;

            let result = match (request, cursor) {
                (PageRequest::First, _) => self.client.search(keyword, self.sort).await,
                (PageRequest::Next, Some(cursor)) => self.client.next_page(cursor).await,
                (PageRequest::Next, None) => return Ok(Page::new(Vec::new(), None)),
            };

            let err = match result {
                Ok(page) => return Ok(page),
                Err(err) => err,
            };
            attempt += 1;
            if !self.retry.should_retry(attempt, &err) {
                return Err(FetchFailure::Upstream(err));
            }
            let delay = self.retry.backoff(attempt);
            scout_warn!(
                "Request failed ({}); retry {} of {} in {:.1}s",
                err,
                attempt,
                self.retry.max_retries,
                delay.as_secs_f64()
            );
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(FetchFailure::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn flush_batch(&mut self, collected: usize) -> Result<(), ScrapeError> {
        let rows = self.writer.flush()?;
        if rows > 0 {
            scout_info!("Collected and saved {} posts...", collected);
            self.sink.emit(ScrapeEvent::BatchFlushed {
                rows,
                persisted: self.writer.persisted(),
            });
        }
        Ok(())
    }
}

fn dispatch(state: &mut RunState, queue: &mut VecDeque<Effect>, msg: Msg) {
    let (next, effects) = update(state.clone(), msg);
    *state = next;
    queue.extend(effects);
}
