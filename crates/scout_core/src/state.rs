#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Init,
    Fetching,
    Extracting,
    Done,
    Failed,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    TargetReached,
    /// Upstream had no further pages. Not an error.
    Exhausted,
    Cancelled,
    Failed,
}

/// Counters and phase of one pagination run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    phase: Phase,
    max_records: usize,
    collected: usize,
    skipped: usize,
    pages: usize,
    page_has_cursor: bool,
    termination: Option<Termination>,
}

impl RunState {
    pub fn new(max_records: usize) -> Self {
        Self {
            phase: Phase::Init,
            max_records,
            collected: 0,
            skipped: 0,
            pages: 0,
            page_has_cursor: false,
            termination: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    pub fn collected(&self) -> usize {
        self.collected
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Done | Phase::Failed)
    }

    pub(crate) fn begin_fetch(&mut self) {
        self.phase = Phase::Fetching;
    }

    pub(crate) fn begin_page(&mut self, has_cursor: bool) {
        self.pages += 1;
        self.page_has_cursor = has_cursor;
        self.phase = Phase::Extracting;
    }

    pub(crate) fn page_has_cursor(&self) -> bool {
        self.page_has_cursor
    }

    pub(crate) fn count_collected(&mut self) {
        self.collected += 1;
    }

    pub(crate) fn count_skipped(&mut self) {
        self.skipped += 1;
    }

    pub(crate) fn target_reached(&self) -> bool {
        self.collected >= self.max_records
    }

    pub(crate) fn finish(&mut self, termination: Termination) {
        self.phase = match termination {
            Termination::Failed => Phase::Failed,
            _ => Phase::Done,
        };
        self.termination = Some(termination);
    }
}
