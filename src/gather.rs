//! Many-to-one reassembly, the inverse of scatter.
//!
//! Destinations are drained strictly one after another in row order. For
//! files that order is the byte order of the result, so rows must come in
//! the order of the original partition.

use std::iter;

use futures::FutureExt;
use tracing::info;

use crate::distributor::{Distributor, Summary};
use crate::error::Result;
use crate::listing::LineInterval;
use crate::remote::Cluster;
use crate::table::{ConfigRow, Pattern};

impl<'a, B: Cluster + ?Sized> Distributor<'a, B> {
    /// Dispatches on whether the gather target is a regular file.
    pub async fn gather(&self, source: &ConfigRow, destinations: &[ConfigRow]) -> Result<Summary> {
        Pattern::Gather.check_counts(1, destinations.len())?;
        let target = &source.spec;
        if self.backend.is_file(&target.node, &target.path).await? {
            self.gather_file(source, destinations).await
        } else {
            self.gather_folder(source, destinations).await
        }
    }

    /// Merges every destination tree into the source root.
    async fn gather_folder(
        &self,
        source: &ConfigRow,
        destinations: &[ConfigRow],
    ) -> Result<Summary> {
        let mut summary = Summary::default();
        for dest in destinations {
            let from = dest.spec.with_trailing_slash();
            let copy = self.backend.copy(&from, &source.spec, None).boxed();
            summary.transfers += self.pool.round(iter::once(copy)).await?;
            summary.rounds += 1;
            info!(
                done = summary.rounds,
                total = destinations.len(),
                from = %from,
                "gathering folders"
            );
        }
        Ok(summary)
    }

    /// Clears the target, then appends each destination's file in turn.
    async fn gather_file(&self, source: &ConfigRow, destinations: &[ConfigRow]) -> Result<Summary> {
        let target = &source.spec;
        self.backend.remove_file(&target.node, &target.path).await?;

        let mut summary = Summary::default();
        for dest in destinations {
            let send = self
                .backend
                .send_lines(&dest.spec, target, LineInterval::WHOLE, true)
                .boxed();
            summary.transfers += self.pool.round(iter::once(send)).await?;
            summary.rounds += 1;
            info!(
                done = summary.rounds,
                total = destinations.len(),
                from = %dest.spec,
                "gathering file"
            );
        }
        Ok(summary)
    }
}
