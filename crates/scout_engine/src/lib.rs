//! Scout engine: rate limiting, session and search IO, extraction and
//! batched CSV persistence around the pagination loop.
mod driver;
mod extract;
mod fetch;
mod filename;
mod limiter;
mod persist;
mod retry;
mod session;
mod types;
mod writer;

pub use driver::PaginationDriver;
pub use extract::{
    MediaAttachment, MediaKind, MediaStream, PostAuthor, PostExtractor, PostItem, RecordExtractor,
    UrlEntity,
};
pub use fetch::{FetchSettings, HttpSearchClient, SearchClient};
pub use filename::output_filename;
pub use limiter::{Cancelled, RateLimiter};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use retry::RetryPolicy;
pub use session::{CachedSession, Credentials, HttpSessionProvider, SessionProvider};
pub use types::{
    ExtractionError, FailureKind, NullProgressSink, Page, PageCursor, ProgressSink, RunReport,
    ScrapeError, ScrapeEvent, SortMode, UpstreamError,
};
pub use writer::{BatchSink, BatchWriter, DEFAULT_BATCH_SIZE};
