//! Cancellation of in-flight schema work.
//!
//! A migration can only be abandoned between statements it controls: the
//! executor polls the token before each operation and once more before the
//! migration is recorded, then rolls the whole unit back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::MigrationError;

pub trait Cancellable {
    fn is_cancelled(&self) -> bool;

    /// Request cancellation. Idempotent.
    fn cancel(&self);

    /// `Err(MigrationError::Cancelled)` once cancellation was requested.
    fn check(&self) -> Result<(), MigrationError> {
        if self.is_cancelled() {
            Err(MigrationError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Shared flag; clones observe the same state, so an operator thread can
/// cancel a migration running on the writer connection.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    requested: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cancellable for CancellationToken {
    fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    fn cancel(&self) {
        self.requested.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_request() {
        let token = CancellationToken::new();
        let handle = token.clone();
        assert!(token.check().is_ok());

        handle.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(MigrationError::Cancelled)));
    }
}
