//! Paced, cancellable sequential iteration.
//!
//! The endpoint is rate limited, so every loop in the pipeline (units,
//! enhancement groups, files) follows the same rule: process items strictly
//! in order and sleep for the configured interval between consecutive items,
//! never before the first or after the last. [`run_paced`] is the one place
//! that rule is written down.
//!
//! Cancellation is cooperative. [`Cancellation::cancel`] stops the loop
//! before the next item starts and cuts a pause short; an item already in
//! flight (one HTTP request, one LibreOffice run) always completes.

use crate::progress::ProgressReporter;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Returned when a paced loop stops because of [`Cancellation::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Cloneable cancellation flag shared between the caller and the pipeline.
#[derive(Debug, Clone)]
pub struct Cancellation {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once [`Cancellation::cancel`] has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|c| *c).await;
    }

    /// Fail fast if cancellation was requested.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Pacing parameters for one loop.
pub struct Pacing<'a> {
    pub pause: Duration,
    pub reporter: &'a dyn ProgressReporter,
    pub cancel: &'a Cancellation,
}

impl Pacing<'_> {
    /// Sleep for the pacing interval unless cancelled first.
    pub async fn pause(&self) -> Result<(), Cancelled> {
        self.cancel.check()?;
        self.reporter.on_pause(self.pause);
        debug!("Pausing {:?} to respect rate limits", self.pause);
        tokio::select! {
            _ = tokio::time::sleep(self.pause) => Ok(()),
            _ = self.cancel.cancelled() => Err(Cancelled),
        }
    }
}

/// Run `action` over `items` in order, pausing between consecutive items.
///
/// `action` receives the 0-based index and the item. Exactly
/// `items.len() - 1` pauses are taken for a non-empty input. Returns
/// [`Cancelled`] if cancellation is observed before an item starts or
/// during a pause; results of items already processed are dropped.
pub async fn run_paced<T, R, F, Fut>(
    items: Vec<T>,
    pacing: &Pacing<'_>,
    mut action: F,
) -> Result<Vec<R>, Cancelled>
where
    F: FnMut(usize, T) -> Fut,
    Fut: Future<Output = R>,
{
    let mut results = Vec::with_capacity(items.len());

    for (idx, item) in items.into_iter().enumerate() {
        if idx > 0 {
            pacing.pause().await?;
        }
        pacing.cancel.check()?;
        results.push(action(idx, item).await);
    }

    Ok(results)
}
