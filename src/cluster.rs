//! The production backend: one SSH session per node, rsync and sed for the
//! actual bytes.
//!
//! Copies run on the receiving node and pull from the sending node, so every
//! node must be able to reach its peers over SSH as well.

use std::collections::HashMap;

use async_trait::async_trait;
use colourado::{ColorPalette, PaletteType};
use futures::future::join_all;
use itertools::{zip, Itertools};
use tracing::info;

use crate::command::Templates;
use crate::error::{DistcopyError, Result};
use crate::listing::LineInterval;
use crate::node::{NodeRef, PathSpec};
use crate::remote::{RemoteExecutor, Transfer};
use crate::session::Session;

pub struct SshCluster {
    sessions: HashMap<NodeRef, Session>,
    templates: Templates,
}

impl SshCluster {
    /// Connects to every node concurrently. Any failed connection aborts.
    pub async fn connect(nodes: impl IntoIterator<Item = NodeRef>) -> Result<Self> {
        let nodes: Vec<NodeRef> = nodes.into_iter().unique().collect();
        let templates = Templates::new()?;
        if nodes.is_empty() {
            return Ok(Self {
                sessions: HashMap::new(),
                templates,
            });
        }
        let colors = ColorPalette::new(nodes.len() as u32, PaletteType::Pastel, false).colors;
        let connected =
            join_all(zip(nodes, colors).map(|(node, color)| Session::connect(node, color))).await;

        let mut sessions = HashMap::with_capacity(connected.len());
        let mut failure = None;
        for session in connected {
            match session {
                Ok(session) => {
                    sessions.insert(session.node.clone(), session);
                }
                Err(e) => failure = failure.or(Some(e)),
            }
        }
        if let Some(e) = failure {
            join_all(sessions.into_values().map(Session::close)).await;
            return Err(e);
        }
        info!(nodes = sessions.len(), "connected to all nodes");
        Ok(Self {
            sessions,
            templates,
        })
    }

    pub async fn close(self) {
        join_all(self.sessions.into_values().map(Session::close)).await;
    }

    fn session(&self, node: &NodeRef) -> Result<&Session> {
        self.sessions.get(node).ok_or_else(|| {
            DistcopyError::Config(format!("Node {} is not connected", node))
        })
    }
}

#[async_trait]
impl RemoteExecutor for SshCluster {
    async fn list_files(&self, node: &NodeRef, folder: &str) -> Result<Vec<String>> {
        let job = self.templates.list_files(folder)?;
        let output = self.session(node)?.output(&job).await?;
        if !output.status.success() {
            return Err(DistcopyError::Query(format!(
                "Error during listing files in folder {} on node {}",
                folder, node
            )));
        }
        let root = folder.trim_end_matches('/');
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| match line.strip_prefix(root) {
                Some(relative) => relative.trim_start_matches('/').to_string(),
                None => line.to_string(),
            })
            .collect())
    }

    async fn is_file(&self, node: &NodeRef, path: &str) -> Result<bool> {
        let job = self.templates.is_file(path)?;
        let output = self.session(node)?.output(&job).await?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(DistcopyError::Query(format!(
                "Error while checking {} on node {} ({})",
                path, node, output.status
            ))),
        }
    }

    async fn line_count(&self, node: &NodeRef, path: &str) -> Result<usize> {
        let job = self.templates.line_count(path)?;
        let output = self.session(node)?.output(&job).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.trim().parse() {
            Ok(count) if output.status.success() => Ok(count),
            _ => Err(DistcopyError::Query(format!(
                "Error while counting lines of {} on node {}",
                path, node
            ))),
        }
    }

    async fn remove_file(&self, node: &NodeRef, path: &str) -> Result<()> {
        let job = self.templates.remove_file(path)?;
        let output = self.session(node)?.output(&job).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(DistcopyError::Query(format!(
                "Error during file removal of {} on node {}",
                path, node
            )))
        }
    }
}

#[async_trait]
impl Transfer for SshCluster {
    async fn copy(&self, src: &PathSpec, dst: &PathSpec, files: Option<&[String]>) -> Result<()> {
        let job = self.templates.copy(src, dst, files.is_some())?;
        let input = files.map(|files| files.iter().map(|f| format!("{}\n", f)).join(""));
        let status = self
            .session(&dst.node)?
            .run(&job, input.as_deref().map(str::as_bytes))
            .await?;
        if status.success() {
            Ok(())
        } else {
            Err(DistcopyError::Transfer(format!(
                "Error during copy from {} to {} ({})",
                src, dst, status
            )))
        }
    }

    async fn send_lines(
        &self,
        src: &PathSpec,
        dst: &PathSpec,
        interval: LineInterval,
        append: bool,
    ) -> Result<()> {
        let job = self.templates.send_lines(src, dst, interval, append)?;
        let status = self.session(&src.node)?.run(&job, None).await?;
        if status.success() {
            Ok(())
        } else {
            Err(DistcopyError::Transfer(format!(
                "Error during copy of lines {:?}..{:?} from {} to {} ({})",
                interval.from, interval.to, src, dst, status
            )))
        }
    }
}
