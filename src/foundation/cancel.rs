use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Cooperative, batch-wide cancellation flag.
///
/// Cloning shares the flag. Work already in flight (including a running subprocess) is never
/// interrupted; callers poll [`CancelFlag::is_cancelled`] before starting the next unit of work.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// New, not-cancelled flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// `true` once [`CancelFlag::cancel`] has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
