//! Configuration for Distcopy.
//!
//! Holds the clap structs for command line arguments. Row sets themselves are
//! read by `table`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::server::ServerConfig;
use crate::table::Pattern;

#[derive(Parser)]
#[command(version, about = "Distributed copying of folders and files.")]
pub struct Config {
    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand)]
pub enum Mode {
    /// Broadcast files from source node to all destination nodes
    Broadcast {
        /// Row set (CSV or YAML) of the broadcast
        config: PathBuf,
    },
    /// Distribute parts of a folder or file from source nodes to all destination nodes
    Scatter {
        /// Row set (CSV or YAML) of the scatter
        config: PathBuf,
    },
    /// Gather parts from all destination nodes back to the source node
    Gather {
        /// Row set (CSV or YAML) of the gather
        config: PathBuf,
    },
    /// Run the remote command server on this node
    Serve {
        #[arg(long, default_value = "localhost")]
        host: String,
        #[arg(long, default_value_t = 8888)]
        port: u16,
        /// Token clients must present
        #[arg(long, env = "DISTCOPY_TOKEN")]
        token: Option<String>,
    },
    /// Send one command to a remote command server and print its response
    Remote {
        /// Server address, `host:port`
        addr: String,
        /// One of ping, free_disk_space, copy_rsync, kill
        command: String,
        #[arg(long, env = "DISTCOPY_TOKEN")]
        token: Option<String>,
        /// (free_disk_space) Folder whose filesystem to query
        #[arg(long)]
        folder: Option<String>,
        /// (copy_rsync) Source path on the server's node
        #[arg(long)]
        src: Option<String>,
        /// (copy_rsync) Destination path on the server's node
        #[arg(long)]
        dst: Option<String>,
    },
}

impl Mode {
    /// The distribution pattern and row set file, for the three pattern modes.
    pub fn pattern(&self) -> Option<(Pattern, &PathBuf)> {
        match self {
            Mode::Broadcast { config } => Some((Pattern::Broadcast, config)),
            Mode::Scatter { config } => Some((Pattern::Scatter, config)),
            Mode::Gather { config } => Some((Pattern::Gather, config)),
            Mode::Serve { .. } | Mode::Remote { .. } => None,
        }
    }

    pub fn server_config(&self) -> Option<ServerConfig> {
        match self {
            Mode::Serve { host, port, token } => Some(ServerConfig {
                host: host.clone(),
                port: *port,
                token: token.clone(),
            }),
            _ => None,
        }
    }
}
