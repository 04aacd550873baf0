//! Barrier-synchronized rounds of parallel work.
//!
//! A round is a batch of independent operations. All of them run to
//! completion, bounded by the worker limit, before the round reports back.
//! Nothing of the next round is issued before that.

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::error::Result;

/// Scheduler settings passed explicitly to every `Distributor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Upper bound on operations in flight within one round.
    pub workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            workers: (cpus + 4).min(32),
        }
    }
}

/// One unit of work within a round.
pub type Operation<'a> = BoxFuture<'a, Result<()>>;

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(settings: Settings) -> Self {
        Self {
            workers: settings.workers.max(1),
        }
    }

    /// Runs every operation and waits for all of them.
    ///
    /// A failing operation does not cancel its siblings. Once all have
    /// finished, the first failure (in completion order) is returned and the
    /// rest are logged. Returns the number of operations on success.
    pub async fn round<'a, I>(&self, operations: I) -> Result<usize>
    where
        I: IntoIterator<Item = Operation<'a>>,
    {
        let results: Vec<Result<()>> = stream::iter(operations)
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let total = results.len();
        let mut first_error = None;
        for error in results.into_iter().filter_map(|result| result.err()) {
            if first_error.is_none() {
                first_error = Some(error);
            } else {
                warn!(%error, "additional failure in the same round");
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(total),
        }
    }
}
