//! Distcopy: Broadcast, scatter, and gather files across compute nodes.

// Serde helper module.
mod serde;
// Command line arguments.
pub mod config;
// Error handling.
pub mod error;
// Nodes and paths on them.
pub mod node;
// Row sets and their validation.
pub mod table;
// File listings and line intervals.
pub mod listing;
// Collaborator traits.
pub mod remote;
// Barrier-synchronized worker rounds.
pub mod round;
// Shell command templates.
pub mod command;
// SSH session wrapper.
pub mod session;
// SSH-backed cluster.
pub mod cluster;
// Distribution patterns.
pub mod distributor;
pub mod broadcast;
pub mod scatter;
pub mod gather;
// Remote command service.
pub mod protocol;
pub mod server;
pub mod client;

pub use client::Client;
pub use cluster::SshCluster;
pub use config::{Config, Mode};
pub use distributor::{Distributor, Summary};
pub use error::{DistcopyError, Result};
pub use listing::{FileListing, LineInterval};
pub use node::{NodeRef, PathSpec};
pub use protocol::{Request, Response};
pub use remote::{Cluster, RemoteExecutor, Transfer};
pub use round::{Settings, WorkerPool};
pub use server::{LocalCopy, Rsync, Server, ServerConfig};
pub use session::Session;
pub use table::{ConfigRow, Direction, IndexRange, Pattern, RowSet};
