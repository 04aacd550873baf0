//! One-to-many partitioning.
//!
//! Each destination row names the slice of the source it receives, as an
//! index range over the sorted file listing (directory sources) or over the
//! lines of the file (file sources). Ranges are taken as given: nothing
//! checks that they cover the source or that they do not overlap.

use futures::FutureExt;
use itertools::zip;
use tracing::info;

use crate::distributor::{Distributor, Summary};
use crate::error::Result;
use crate::listing::{FileListing, LineInterval};
use crate::remote::Cluster;
use crate::table::{ConfigRow, Pattern};

impl<'a, B: Cluster + ?Sized> Distributor<'a, B> {
    /// Dispatches on whether the first source is a regular file.
    pub async fn scatter(
        &self,
        sources: &[ConfigRow],
        destinations: &[ConfigRow],
    ) -> Result<Summary> {
        Pattern::Scatter.check_counts(sources.len(), destinations.len())?;
        let first = &sources[0].spec;
        if self.backend.is_file(&first.node, &first.path).await? {
            self.scatter_file(sources, destinations).await
        } else {
            self.scatter_folder(sources, destinations).await
        }
    }

    /// Destinations are served in batches of `sources.len()`, the i-th
    /// destination of a batch by the i-th source. The listing comes from the
    /// first source; the other sources must hold the same tree.
    async fn scatter_folder(
        &self,
        sources: &[ConfigRow],
        destinations: &[ConfigRow],
    ) -> Result<Summary> {
        let first = &sources[0].spec;
        let listing = FileListing::new(self.backend.list_files(&first.node, &first.path).await?);
        info!(files = listing.len(), source = %first, "scattering folder");

        let mut summary = Summary::default();
        for batch in destinations.chunks(sources.len()) {
            let copies = zip(sources, batch).map(|(source, dest)| {
                let files = listing.slice(dest.range);
                self.backend
                    .copy(&source.spec, &dest.spec, Some(files))
                    .boxed()
            });
            summary.transfers += self.pool.round(copies).await?;
            summary.rounds += 1;
            info!(
                round = summary.rounds,
                done = summary.transfers,
                total = destinations.len(),
                "scattering folder"
            );
        }
        Ok(summary)
    }

    /// One round per destination, with one transfer from every source.
    ///
    /// Transfers append, so a destination fed by several sources ends up
    /// with their contributions in whatever order the appends land.
    async fn scatter_file(
        &self,
        sources: &[ConfigRow],
        destinations: &[ConfigRow],
    ) -> Result<Summary> {
        let mut summary = Summary::default();
        for dest in destinations {
            let interval = LineInterval::from(dest.range);
            let sends = sources.iter().map(|source| {
                async move {
                    let interval = if interval.needs_line_count() {
                        let count = self
                            .backend
                            .line_count(&source.spec.node, &source.spec.path)
                            .await?;
                        interval.resolve(count)
                    } else {
                        interval
                    };
                    self.backend
                        .send_lines(&source.spec, &dest.spec, interval, true)
                        .await
                }
                .boxed()
            });
            summary.transfers += self.pool.round(sends).await?;
            summary.rounds += 1;
            info!(
                round = summary.rounds,
                done = summary.rounds,
                total = destinations.len(),
                destination = %dest.spec,
                "scattering file"
            );
        }
        Ok(summary)
    }
}
