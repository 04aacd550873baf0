//! The two collaborators every scheduler drives.
//!
//! `RemoteExecutor` answers questions about a node's state, `Transfer` moves
//! bytes between two nodes. `SshCluster` implements both over SSH; tests use
//! local doubles.

use async_trait::async_trait;

use crate::error::Result;
use crate::listing::LineInterval;
use crate::node::{NodeRef, PathSpec};

#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Regular files under `folder`, recursively, relative to `folder`.
    /// Order is unspecified.
    async fn list_files(&self, node: &NodeRef, folder: &str) -> Result<Vec<String>>;

    async fn is_file(&self, node: &NodeRef, path: &str) -> Result<bool>;

    /// Counts a final line even when it lacks a trailing newline.
    async fn line_count(&self, node: &NodeRef, path: &str) -> Result<usize>;

    /// Removing a file that does not exist succeeds.
    async fn remove_file(&self, node: &NodeRef, path: &str) -> Result<()>;
}

#[async_trait]
pub trait Transfer: Send + Sync {
    /// Archive-mode copy of `src` to `dst`, creating `dst`'s parent.
    /// With `files`, only those paths (relative to `src`) are copied.
    async fn copy(&self, src: &PathSpec, dst: &PathSpec, files: Option<&[String]>) -> Result<()>;

    /// Writes the lines of `src` within `interval` to `dst`, appending when
    /// `append` is set and truncating otherwise.
    async fn send_lines(
        &self,
        src: &PathSpec,
        dst: &PathSpec,
        interval: LineInterval,
        append: bool,
    ) -> Result<()>;
}

/// A backend able to run every distribution pattern.
pub trait Cluster: RemoteExecutor + Transfer {}

impl<T: RemoteExecutor + Transfer + ?Sized> Cluster for T {}
