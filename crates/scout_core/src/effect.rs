use crate::Termination;

/// Which upstream call the next fetch should make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// Initial keyword search.
    First,
    /// Continue from the cursor of the previous page.
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Wait for rate-limit permission, then issue the request.
    AcquireAndFetch(PageRequest),
    /// Run the current page's items through extraction, in arrival order.
    ExtractItems,
    /// Flush anything buffered and stop.
    Finish(Termination),
}
