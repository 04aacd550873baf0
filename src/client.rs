//! Client side of the remote command service.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{DistcopyError, Result};
use crate::protocol::{Request, Response};

pub struct Client {
    addr: String,
    token: Option<String>,
}

impl Client {
    pub fn new(addr: impl Into<String>, token: Option<String>) -> Self {
        Self {
            addr: addr.into(),
            token,
        }
    }

    /// Sends one request over a fresh connection. The client's token is
    /// attached unless the request already carries one.
    pub async fn send(&self, mut request: Request) -> Result<Response> {
        if request.token.is_none() {
            request.token = self.token.clone();
        }
        let mut stream = TcpStream::connect(&self.addr).await?;
        stream.write_all(&serde_json::to_vec(&request)?).await?;
        stream.shutdown().await?;
        let mut data = Vec::new();
        stream.read_to_end(&mut data).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub async fn ping(&self) -> Result<String> {
        let response = self.send(Request::ping()).await?;
        let (message, _) = response.into_result("ping", DistcopyError::Query)?;
        Ok(message)
    }

    /// Free bytes on the filesystem holding `folder`.
    pub async fn free_disk_space(&self, folder: &str) -> Result<u64> {
        let response = self.send(Request::free_disk_space(folder)).await?;
        match response.into_result("free_disk_space", DistcopyError::Query)? {
            (_, Some(free)) => Ok(free),
            (message, None) => Err(DistcopyError::Query(format!(
                "Response to free_disk_space carries no free space: {}",
                message
            ))),
        }
    }

    pub async fn copy_rsync(&self, src: &str, dst: &str) -> Result<()> {
        let response = self.send(Request::copy_rsync(src, dst)).await?;
        response.into_result("copy_rsync", DistcopyError::Transfer)?;
        Ok(())
    }

    pub async fn kill(&self) -> Result<()> {
        let response = self.send(Request::kill()).await?;
        response.into_result("kill", DistcopyError::Query)?;
        Ok(())
    }
}
