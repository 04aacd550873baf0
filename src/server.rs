//! Remote command service run on every node.
//!
//! The server answers one request per connection. Its only state shared
//! across connections is the stop flag raised by `kill`. The `kill` reply is
//! only completed once the listener is gone, so a client that has read
//! "Server killed" can no longer connect. Handlers already running finish.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Notify};
use tracing::{debug, info, warn};

use crate::error::{DistcopyError, Result};
use crate::protocol::{
    Request, Response, COPY_FAILED, INVALID_TOKEN, PONG, SERVER_KILLED, SUCCESS, UNKNOWN_COMMAND,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Shared secret every request must carry, if set.
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8888,
            token: None,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Copies between two paths on the local machine.
#[async_trait]
pub trait LocalCopy: Send + Sync {
    async fn copy(&self, src: &str, dst: &str) -> Result<()>;
}

/// `rsync -a src dst`.
pub struct Rsync;

#[async_trait]
impl LocalCopy for Rsync {
    async fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let status = tokio::process::Command::new("rsync")
            .arg("-a")
            .arg(src)
            .arg(dst)
            .status()
            .await?;
        if status.success() {
            Ok(())
        } else {
            Err(DistcopyError::Transfer(format!(
                "rsync from {} to {} exited with {}",
                src, dst, status
            )))
        }
    }
}

struct Shared {
    config: ServerConfig,
    copier: Box<dyn LocalCopy>,
    stopped: AtomicBool,
    shutdown: Notify,
    /// Set once the listener has been dropped.
    closed: watch::Sender<bool>,
}

pub struct Server {
    listener: TcpListener,
    shared: Arc<Shared>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        Self::bind_with(config, Rsync).await
    }

    pub async fn bind_with(config: ServerConfig, copier: impl LocalCopy + 'static) -> Result<Self> {
        let listener = TcpListener::bind(config.addr()).await?;
        Ok(Self {
            listener,
            shared: Arc::new(Shared {
                config,
                copier: Box::new(copier),
                stopped: AtomicBool::new(false),
                shutdown: Notify::new(),
                closed: watch::channel(false).0,
            }),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until a `kill` request has been answered.
    pub async fn serve(self) -> Result<()> {
        info!(addr = %self.local_addr()?, auth = self.shared.config.token.is_some(), "serving");
        while !self.shared.stopped.load(Ordering::Acquire) {
            let accepted = tokio::select! {
                biased;
                _ = self.shared.shutdown.notified() => break,
                accepted = self.listener.accept() => accepted,
            };
            match accepted {
                Ok(_) if self.shared.stopped.load(Ordering::Acquire) => break,
                Ok((stream, peer)) => {
                    let shared = Arc::clone(&self.shared);
                    tokio::spawn(async move {
                        if let Err(error) = shared.handle(stream).await {
                            warn!(%peer, %error, "failed to serve connection");
                        }
                    });
                }
                Err(error) => warn!(%error, "failed to accept connection"),
            }
        }
        drop(self.listener);
        self.shared.closed.send_replace(true);
        info!("server stopped");
        Ok(())
    }
}

impl Shared {
    async fn handle(&self, mut stream: TcpStream) -> Result<()> {
        let mut data = Vec::new();
        stream.read_to_end(&mut data).await?;
        let (response, kill) = self.respond(&data).await;
        stream.write_all(&serde_json::to_vec(&response)?).await?;
        stream.flush().await?;
        if kill {
            let mut closed = self.closed.subscribe();
            self.stopped.store(true, Ordering::Release);
            self.shutdown.notify_one();
            // The client sees the end of the reply only after the listener is gone.
            let _ = closed.wait_for(|closed| *closed).await;
        }
        stream.shutdown().await?;
        Ok(())
    }

    /// Produces the response and whether the server has to stop afterwards.
    async fn respond(&self, data: &[u8]) -> (Response, bool) {
        let value: Value = match serde_json::from_slice(data) {
            Ok(value) => value,
            Err(_) if self.config.token.is_some() => {
                return (Response::error(INVALID_TOKEN), false)
            }
            Err(e) => return (Response::error(format!("Invalid request: {}", e)), false),
        };
        if let Some(token) = &self.config.token {
            if value.get("token").and_then(Value::as_str) != Some(token.as_str()) {
                warn!("rejected request with invalid token");
                return (Response::error(INVALID_TOKEN), false);
            }
        }
        let request: Request = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => return (Response::error(format!("Invalid request: {}", e)), false),
        };
        debug!(command = %request.command, "request");

        match request.command.as_str() {
            "ping" => (Response::message(PONG), false),
            "kill" => {
                info!("kill requested");
                (Response::message(SERVER_KILLED), true)
            }
            "free_disk_space" => (self.free_disk_space(request.folder.as_deref()), false),
            "copy_rsync" => (self.copy_rsync(request.src, request.dst).await, false),
            _ => (Response::error(UNKNOWN_COMMAND), false),
        }
    }

    fn free_disk_space(&self, folder: Option<&str>) -> Response {
        let Some(folder) = folder else {
            return missing("folder");
        };
        match fs4::available_space(folder) {
            Ok(free) => Response::Message {
                message: SUCCESS.to_string(),
                free: Some(free),
            },
            Err(e) => Response::error(format!(
                "Error during disk space query of {}: {}",
                folder, e
            )),
        }
    }

    async fn copy_rsync(&self, src: Option<String>, dst: Option<String>) -> Response {
        let Some(src) = src else {
            return missing("src");
        };
        let Some(dst) = dst else {
            return missing("dst");
        };
        match self.copier.copy(&src, &dst).await {
            Ok(()) => Response::message(SUCCESS),
            Err(error) => {
                warn!(%src, %dst, %error, "copy failed");
                Response::error(COPY_FAILED)
            }
        }
    }
}

fn missing(field: &str) -> Response {
    Response::error(format!("Missing field '{}'", field))
}
