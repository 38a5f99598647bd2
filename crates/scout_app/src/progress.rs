use scout_engine::{ProgressSink, ScrapeEvent};
use scout_logging::{scout_debug, scout_info};

/// Reports run progress through the log.
///
/// Cooldown ticks arrive about once a second; only whole minutes are logged
/// at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: ScrapeEvent) {
        match event {
            ScrapeEvent::RunStarted {
                keyword,
                output_path,
            } => scout_debug!("Run for '{}' writing to {:?}", keyword, output_path),
            ScrapeEvent::PageFetched { page, items } => {
                scout_debug!("Page {} returned {} items", page, items)
            }
            ScrapeEvent::ItemSkipped { reason } => scout_debug!("Skipped item: {}", reason),
            ScrapeEvent::BatchFlushed { rows, persisted } => {
                scout_debug!("Flushed {} rows ({} on disk)", rows, persisted)
            }
            ScrapeEvent::Cooldown { remaining } => {
                let secs = remaining.as_secs();
                if secs > 0 && secs % 60 == 0 {
                    scout_info!("Rate limit cooldown: {} minutes remaining", secs / 60);
                }
            }
            ScrapeEvent::Exhausted { collected } => {
                scout_debug!("Results exhausted after {} records", collected)
            }
            ScrapeEvent::RunFinished {
                collected,
                persisted,
            } => scout_debug!("Run finished: {} collected, {} persisted", collected, persisted),
        }
    }
}
