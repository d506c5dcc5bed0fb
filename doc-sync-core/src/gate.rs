//! Bounded-parallelism admission control for every external-call site.
//!
//! The gate runs on the calling task: at most `limit` thunks are in flight,
//! and the next queued thunk is started in the same poll that observes a
//! running one settle. Nothing is spawned, so there is no cross-thread state.

use std::future::Future;
use std::num::NonZeroUsize;

use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyGate {
    limit: NonZeroUsize,
}

impl ConcurrencyGate {
    pub fn new(limit: usize) -> Result<Self, ConfigError> {
        NonZeroUsize::new(limit)
            .map(|limit| Self { limit })
            .ok_or(ConfigError::ZeroConcurrency)
    }

    pub fn limit(&self) -> usize {
        self.limit.get()
    }

    /// Runs every thunk, admitting them in FIFO order, and resolves once all
    /// have settled. Outcomes are returned in submission order; one failure
    /// never cancels its siblings.
    pub async fn drain<I, F, Fut, T, E>(&self, thunks: I) -> Vec<Result<T, E>>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut settled: Vec<(usize, Result<T, E>)> = stream::iter(thunks.into_iter().enumerate())
            .map(|(index, thunk)| async move {
                debug!(index, "Admitted thunk");
                let outcome = thunk().await;
                debug!(index, ok = outcome.is_ok(), "Thunk settled");
                (index, outcome)
            })
            .buffer_unordered(self.limit.get())
            .collect()
            .await;

        let failed = settled.iter().filter(|(_, o)| o.is_err()).count();
        info!(
            total = settled.len(),
            failed,
            limit = self.limit.get(),
            "Concurrency gate drained"
        );
        settled.sort_by_key(|(index, _)| *index);
        settled.into_iter().map(|(_, outcome)| outcome).collect()
    }
}
