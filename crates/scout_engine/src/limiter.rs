use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scout_core::{RateLimitSettings, RateWindow, SettingsError};
use scout_logging::{scout_debug, scout_info};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{NullProgressSink, ProgressSink, ScrapeEvent};

/// Longest single sleep while waiting out a spent window, so progress is
/// reported about once a second.
const COOLDOWN_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rate limit wait cancelled")]
pub struct Cancelled;

/// Gates upstream requests behind a per-window quota plus a randomized
/// per-request delay.
///
/// Both waits are `tokio::time` sleeps, so they yield to the runtime and run
/// on a paused clock in tests. A limiter given a cancellation token stops
/// waiting as soon as the token fires.
pub struct RateLimiter {
    window: RateWindow,
    rng: StdRng,
    cancel: Option<CancellationToken>,
    sink: Arc<dyn ProgressSink>,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings) -> Result<Self, SettingsError> {
        Ok(Self {
            window: RateWindow::new(settings, Instant::now().into_std())?,
            rng: StdRng::from_entropy(),
            cancel: None,
            sink: Arc::new(NullProgressSink),
        })
    }

    /// Use a fixed seed for the inter-request delay.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub(crate) fn attach(&mut self, token: CancellationToken, sink: Arc<dyn ProgressSink>) {
        self.cancel = Some(token);
        self.sink = sink;
    }

    pub fn window(&self) -> &RateWindow {
        &self.window
    }

    /// Return once one more request may be issued, and count it.
    ///
    /// Only fails when a cancellation token was attached and fired; in that
    /// case no budget is consumed.
    pub async fn acquire(&mut self) -> Result<(), Cancelled> {
        self.window.roll(Instant::now().into_std());

        if let Some(reset_at) = self.window.blocked_until() {
            let reset_at = Instant::from_std(reset_at);
            let wait = reset_at.saturating_duration_since(Instant::now());
            scout_info!(
                "Rate limit reached. Waiting {:.2} seconds...",
                wait.as_secs_f64()
            );
            self.cooldown(reset_at).await?;
            self.window.restart(Instant::now().into_std());
        }

        let delay = self.next_delay();
        scout_debug!("Spacing request by {:.2} seconds", delay.as_secs_f64());
        self.pause(delay).await?;
        self.window.record_request();
        Ok(())
    }

    fn next_delay(&mut self) -> Duration {
        let settings = self.window.settings();
        let (min, max) = (settings.min_delay, settings.max_delay);
        if min == max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    async fn cooldown(&self, until: Instant) -> Result<(), Cancelled> {
        loop {
            let now = Instant::now();
            if now >= until {
                return Ok(());
            }
            let remaining = until - now;
            self.sink.emit(ScrapeEvent::Cooldown { remaining });
            self.pause(remaining.min(COOLDOWN_TICK)).await?;
        }
    }

    async fn pause(&self, duration: Duration) -> Result<(), Cancelled> {
        match &self.cancel {
            None => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(Cancelled),
                _ = tokio::time::sleep(duration) => Ok(()),
            },
        }
    }
}
