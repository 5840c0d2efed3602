use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::SortError;

/// Cooperative cancellation signal for a running sort.
///
/// Clones share the same flag. The sort polls the flag before each line it reads or writes and
/// before each chunk it splits, and stops with [SortError::Cancelled] once it is set. Files
/// written up to that point are left as they are.
///
/// # Examples
/// ```
/// use numbered_text_sort::cancellation::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> CancellationToken {
        CancellationToken {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Takes effect at the next I/O boundary of the sort.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<(), SortError> {
        if self.is_cancelled() {
            Err(SortError::Cancelled)
        } else {
            Ok(())
        }
    }
}
