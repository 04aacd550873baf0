//! One-to-many replication over a doubling tree.
//!
//! Every destination that has received its copy serves as a source in the
//! next round, so the number of copies in place at least doubles per round.
//! A served destination is re-read from where the copy landed, so later
//! rounds reproduce the layout of the first one.

use std::path::Path;

use futures::FutureExt;
use itertools::zip;
use tracing::info;

use crate::distributor::{Distributor, Summary};
use crate::error::Result;
use crate::node::PathSpec;
use crate::remote::Cluster;
use crate::table::Pattern;

impl<'a, B: Cluster + ?Sized> Distributor<'a, B> {
    /// Copies the sources' content to every destination.
    ///
    /// A destination is only used as a source once the round that served it
    /// has fully completed. Any failed copy aborts the run after its round;
    /// destinations already served keep their copies.
    pub async fn broadcast(
        &self,
        sources: &[PathSpec],
        destinations: &[PathSpec],
    ) -> Result<Summary> {
        Pattern::Broadcast.check_counts(sources.len(), destinations.len())?;
        let first = &sources[0];
        let is_file = self.backend.is_file(&first.node, &first.path).await?;

        let mut senders: Vec<PathSpec> = sources.to_vec();
        let mut remaining = destinations;
        let mut summary = Summary::default();
        while !remaining.is_empty() {
            let (batch, rest) = remaining.split_at(senders.len().min(remaining.len()));
            let copies = zip(&senders, batch)
                .map(|(src, dst)| self.backend.copy(src, dst, None).boxed());
            summary.transfers += self.pool.round(copies).await?;
            summary.rounds += 1;
            info!(
                round = summary.rounds,
                done = destinations.len() - rest.len(),
                total = destinations.len(),
                "broadcasting"
            );
            senders.extend(batch.iter().map(|dst| landed(first, dst, is_file)));
            remaining = rest;
        }
        Ok(summary)
    }
}

/// Where a copy of `source` into `dst` can be read back from.
///
/// A directory lands inside `dst` (or is merged into it, for a source with a
/// trailing slash), so its contents are what the next round passes on. A
/// file sent into a directory path keeps its own name.
fn landed(source: &PathSpec, dst: &PathSpec, is_file: bool) -> PathSpec {
    if !is_file {
        return dst.with_trailing_slash();
    }
    match (dst.path.ends_with('/'), Path::new(&source.path).file_name()) {
        (true, Some(name)) => PathSpec::new(
            dst.node.clone(),
            format!("{}{}", dst.path, name.to_string_lossy()),
        ),
        _ => dst.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landed_directory_is_read_as_contents() {
        let source = PathSpec::new("a", "/data/dataset");
        let dst = PathSpec::new("b", "/copy");
        assert_eq!(landed(&source, &dst, false), PathSpec::new("b", "/copy/"));
        let dst = PathSpec::new("b", "/copy/");
        assert_eq!(landed(&source, &dst, false), dst);
    }

    #[test]
    fn test_landed_file() {
        let source = PathSpec::new("a", "/data/model.bin");
        let dst = PathSpec::new("b", "/scratch/weights.bin");
        assert_eq!(landed(&source, &dst, true), dst);
        let dst = PathSpec::new("b", "/scratch/");
        assert_eq!(
            landed(&source, &dst, true),
            PathSpec::new("b", "/scratch/model.bin")
        );
    }
}
