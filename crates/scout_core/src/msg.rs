#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Msg {
    /// Output destination is ready; begin paging.
    Start,
    /// A page arrived from upstream.
    PageReceived { items: usize, has_cursor: bool },
    /// One item was extracted and buffered.
    ItemCollected,
    /// One item could not be extracted and was dropped.
    ItemSkipped,
    /// Every item of the current page was handled.
    PageProcessed,
    /// Supervisor asked the run to stop.
    Cancelled,
    /// Unrecoverable upstream or storage failure.
    Failed,
}
