//! Scout core: pure records, run targets, rate-window arithmetic and the
//! pagination state machine. Nothing in this crate performs IO.
mod effect;
mod msg;
mod record;
mod state;
mod target;
mod update;
mod window;

pub use effect::{Effect, PageRequest};
pub use msg::Msg;
pub use record::{Record, LIST_SEPARATOR, RECORD_HEADER};
pub use state::{Phase, RunState, Termination};
pub use target::{RunTarget, TargetError, DEFAULT_MAX_RECORDS};
pub use update::update;
pub use window::{RateLimitSettings, RateWindow, SettingsError};
