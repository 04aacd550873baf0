//! Entry point of the three distribution patterns.
//!
//! The patterns themselves live in `broadcast`, `scatter`, and `gather`; this
//! module holds what they share.

use crate::error::Result;
use crate::node::PathSpec;
use crate::remote::Cluster;
use crate::round::{Settings, WorkerPool};
use crate::table::{Pattern, RowSet};

/// What a finished run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Barrier-separated rounds issued.
    pub rounds: usize,
    /// Transfers completed across all rounds.
    pub transfers: usize,
}

pub struct Distributor<'a, B: ?Sized> {
    pub(crate) backend: &'a B,
    pub(crate) pool: WorkerPool,
}

impl<'a, B: ?Sized> Distributor<'a, B> {
    pub fn new(backend: &'a B, settings: Settings) -> Self {
        Self {
            backend,
            pool: WorkerPool::new(settings),
        }
    }
}

impl<'a, B: Cluster + ?Sized> Distributor<'a, B> {
    /// Validates the row set's shape for `pattern` and runs it.
    pub async fn run(&self, pattern: Pattern, rows: &RowSet) -> Result<Summary> {
        rows.check(pattern)?;
        match pattern {
            Pattern::Broadcast => {
                let sources: Vec<PathSpec> =
                    rows.sources().iter().map(|row| row.spec.clone()).collect();
                let destinations: Vec<PathSpec> = rows
                    .destinations()
                    .iter()
                    .map(|row| row.spec.clone())
                    .collect();
                self.broadcast(&sources, &destinations).await
            }
            Pattern::Scatter => self.scatter(rows.sources(), rows.destinations()).await,
            Pattern::Gather => self.gather(&rows.sources()[0], rows.destinations()).await,
        }
    }
}
