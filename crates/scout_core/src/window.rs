use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("max requests per window must be greater than zero")]
    ZeroBudget,
    #[error("window length must be greater than zero")]
    ZeroWindow,
    #[error("min delay {min:?} exceeds max delay {max:?}")]
    InvertedDelay { min: Duration, max: Duration },
}

/// Quota and spacing applied to upstream requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub max_requests_per_window: u32,
    pub window_length: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        // Upstream allows 50 searches per 15 minutes; stay under it.
        Self {
            max_requests_per_window: 45,
            window_length: Duration::from_secs(900),
            min_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(17),
        }
    }
}

impl RateLimitSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_requests_per_window == 0 {
            return Err(SettingsError::ZeroBudget);
        }
        if self.window_length.is_zero() {
            return Err(SettingsError::ZeroWindow);
        }
        if self.min_delay > self.max_delay {
            return Err(SettingsError::InvertedDelay {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        Ok(())
    }
}

/// Request budget over a fixed-length window.
///
/// Pure bookkeeping: callers pass the current instant in and perform any
/// waiting themselves.
#[derive(Debug, Clone)]
pub struct RateWindow {
    settings: RateLimitSettings,
    request_count: u32,
    window_reset_at: Instant,
}

impl RateWindow {
    pub fn new(settings: RateLimitSettings, now: Instant) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            settings,
            request_count: 0,
            window_reset_at: now + settings.window_length,
        })
    }

    pub fn settings(&self) -> &RateLimitSettings {
        &self.settings
    }

    pub fn request_count(&self) -> u32 {
        self.request_count
    }

    pub fn window_reset_at(&self) -> Instant {
        self.window_reset_at
    }

    /// Start a fresh window if the current one has elapsed.
    pub fn roll(&mut self, now: Instant) {
        if now > self.window_reset_at {
            self.restart(now);
        }
    }

    /// The instant the caller must wait for before issuing another request,
    /// or `None` while budget remains.
    pub fn blocked_until(&self) -> Option<Instant> {
        (self.request_count >= self.settings.max_requests_per_window)
            .then_some(self.window_reset_at)
    }

    /// Reset the budget and open a new window starting at `now`.
    pub fn restart(&mut self, now: Instant) {
        self.request_count = 0;
        self.window_reset_at = now + self.settings.window_length;
    }

    pub fn record_request(&mut self) {
        self.request_count += 1;
    }
}
