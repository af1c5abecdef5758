//! Cooperative cancellation (spec §5): a `CancellationToken`-shaped
//! newtype checked between learning phases (after binarization, after
//! pair stats, after FDR, after transitive reduction). Cancelled work
//! produces no persisted output — callers check `checkpoint()` and
//! propagate `BolcdError::Cancelled` up through `?` rather than writing
//! a partial graph.

use crate::error::{BolcdError, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    generation: AtomicU64,
}

/// Cheaply cloneable; every clone shares the same flag and generation
/// counter. The generation counter lets a caller tell a stale token
/// (from a batch that already finished) apart from the live one without
/// holding a reference to it.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Call between learning phases; returns `Err(BolcdError::Cancelled)`
    /// once `cancel()` has been observed.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(BolcdError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_passes_until_cancelled() {
        let token = CancellationToken::new();
        assert!(token.checkpoint().is_ok());
        token.cancel();
        assert!(matches!(token.checkpoint(), Err(BolcdError::Cancelled)));
    }

    #[test]
    fn clone_shares_cancellation_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn generation_advances_on_each_cancel() {
        let token = CancellationToken::new();
        assert_eq!(token.generation(), 0);
        token.cancel();
        assert_eq!(token.generation(), 1);
    }
}
