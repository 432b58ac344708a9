//! Run deadline.
//!
//! A run gets a fixed wall-clock budget from process start. The [`Deadline`]
//! is handed to the orchestrator, which races every awaited call against it
//! and stops at the first suspension point after expiry. [`arm_hard_kill`]
//! is the last resort for a run that never reaches such a point.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};

/// Cooperative run deadline.
#[derive(Debug, Clone)]
pub struct Deadline {
    token: CancellationToken,
    budget: Duration,
}

impl Deadline {
    /// Create a deadline that only expires when [`Deadline::expire`] is called.
    pub fn new(budget: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            budget,
        }
    }

    /// Create a deadline that expires `budget` from now.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(budget: Duration) -> Self {
        let deadline = Self::new(budget);
        let timer = deadline.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timer.budget) => {
                    log::error!("Run deadline of {}s reached", timer.budget.as_secs());
                    timer.expire();
                }
                _ = timer.token.cancelled() => {}
            }
        });
        deadline
    }

    /// Expire the deadline now.
    pub fn expire(&self) {
        self.token.cancel();
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled()
    }

    fn exceeded(&self) -> AppError {
        AppError::DeadlineExceeded(self.budget.as_secs())
    }

    /// Fail if the deadline has passed.
    pub fn check(&self) -> Result<()> {
        if self.is_expired() {
            return Err(self.exceeded());
        }
        Ok(())
    }

    /// Await `fut` unless the deadline passes first.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(self.exceeded()),
            result = fut => result,
        }
    }
}

/// Terminate the process with status 1 once `after` has elapsed.
///
/// Runs on a plain OS thread so it fires even if the async runtime is wedged.
pub fn arm_hard_kill(after: Duration) {
    std::thread::spawn(move || {
        std::thread::sleep(after);
        log::error!(
            "Run still alive {}s after start, terminating",
            after.as_secs()
        );
        std::process::exit(1);
    });
}
