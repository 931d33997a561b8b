//! Cooperative cancellation for long-running solves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use revmatch_core::{MatchError, MatchResult};

/// Caller-supplied cancellation probe.
///
/// Cloning shares the underlying flag: hand a clone to the solver and keep
/// one to call [`CancelToken::cancel`] from another thread. Solvers consult
/// the probe between MinMax iterations, between rounding rounds, between
/// sequential picks, and periodically while inserting flow edges; a fired
/// probe aborts the solve with [`MatchError::Cancelled`] and no partial
/// assignment.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the associated solve.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Probe point: error out if cancellation was requested.
    pub(crate) fn check(&self) -> MatchResult<()> {
        if self.is_cancelled() {
            Err(MatchError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_flag() {
        let token = CancelToken::new();
        let handle = token.clone();
        assert!(token.check().is_ok());
        handle.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(MatchError::Cancelled)));
    }
}
