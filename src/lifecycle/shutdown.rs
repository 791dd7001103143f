//! Shutdown coordination for the daemon.

use tokio_util::sync::CancellationToken;

/// Coordinator for reactor shutdown.
///
/// Wraps a single-shot cancellation token: once triggered it stays triggered, so a
/// stop requested before anyone waits on it is never lost. Clones share the token
/// and may be triggered from any thread.
#[derive(Debug, Clone)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has been triggered.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the shutdown signal.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// The underlying token, for deriving per-handle child tokens.
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
