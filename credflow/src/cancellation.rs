//! Cooperative cancellation for pipeline operations.
//!
//! The pipeline consults the token exactly once, at operation entry,
//! before the authorization gate. Once an operation is past that check it
//! runs to completion even if the token is cancelled mid-flight; callers
//! wanting finer-grained interruption must wrap the call themselves.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// A token for cooperative cancellation.
///
/// Cancellation is idempotent: only the first reason is kept.
#[derive(Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
    reason: RwLock<Option<String>>,
}

impl CancellationToken {
    /// Creates a new, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation with a reason. First reason wins.
    pub fn cancel(&self, reason: impl Into<String>) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.reason.write() = Some(reason.into());
        }
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.reason().is_none());
    }

    #[test]
    fn cancel_sets_flag_and_reason() {
        let token = CancellationToken::new();
        token.cancel("caller gave up");

        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some("caller gave up".to_string()));
    }

    #[test]
    fn cancel_is_idempotent_first_reason_wins() {
        let token = CancellationToken::new();
        token.cancel("first");
        token.cancel("second");

        assert_eq!(token.reason(), Some("first".to_string()));
    }
}
