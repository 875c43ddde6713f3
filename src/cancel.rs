use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::sequencer::SequenceError;

/// Cooperative cancellation signal with an optional deadline.
///
/// Long-running loops poll [`Cancellation::check`] between units of work;
/// nothing is interrupted mid-computation.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that also trips once `timeout` has elapsed
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub fn check(&self) -> Result<(), SequenceError> {
        if self.is_cancelled() {
            Err(SequenceError::Cancelled)
        } else {
            Ok(())
        }
    }
}
