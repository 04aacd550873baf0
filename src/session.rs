use std::io::Write;
use std::process::{ExitStatus, Output};

use colored::ColoredString;
use colourado::Color;
use futures::future::join3;
use openssh::{KnownHosts, Session as SSHSession, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::error::Result;
use crate::node::NodeRef;

/// One multiplexed SSH connection to a node.
pub struct Session {
    pub node: NodeRef,
    colornode: ColoredString,
    session: SSHSession,
}

impl Session {
    pub async fn connect(node: NodeRef, color: Color) -> Result<Self> {
        let colornode = node.prettify(color);
        let session = match SSHSession::connect_mux(node.as_str(), KnownHosts::Add).await {
            Ok(session) => session,
            Err(e) => {
                warn!(%node, error = ?e, "failed to connect to node");
                return Err(e.into());
            }
        };
        debug!(%node, "connected to node");
        Ok(Self {
            node,
            colornode,
            session,
        })
    }

    /// Runs `job` through `sh -c`, streaming its output line by line with the
    /// colored node name in front. `input`, if any, is written to stdin.
    pub async fn run(&self, job: &str, input: Option<&[u8]>) -> Result<ExitStatus> {
        println!("{} === run '{}' ===", self.colornode, job);
        let mut cmd = self.session.command("sh");
        cmd.arg("-c")
            .arg(job)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut process = cmd.spawn().await?;

        let stdin = process.stdin().take();
        let feed = async move {
            if let (Some(mut stdin), Some(input)) = (stdin, input) {
                stdin.write_all(input).await?;
                stdin.shutdown().await?;
            }
            Ok::<_, std::io::Error>(())
        };
        let (fed, out, err) = join3(
            feed,
            self.stream(process.stdout().take()),
            self.stream(process.stderr().take()),
        )
        .await;
        fed?;
        out?;
        err?;

        let result = process.wait().await;
        match &result {
            Ok(status) => println!("{} === done ({}) ===", self.colornode, status),
            Err(error) => println!("{} === done (error: {}) ===", self.colornode, error),
        };
        Ok(result?)
    }

    /// Runs `job` through `sh -c` and captures its output instead of printing it.
    pub async fn output(&self, job: &str) -> Result<Output> {
        debug!(node = %self.node, job, "query");
        Ok(self.session.command("sh").arg("-c").arg(job).output().await?)
    }

    pub async fn close(self) {
        debug!(node = %self.node, "terminating connection");
        if let Err(e) = self.session.close().await {
            warn!(node = %self.node, error = %e, "error while terminating connection");
        }
    }

    async fn stream<B: AsyncRead + Unpin>(&self, stream: Option<B>) -> std::io::Result<()> {
        let Some(stream) = stream else {
            return Ok(());
        };
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::with_capacity(reader.buffer().len());
        loop {
            // Read into the buffer until either \r or \n is met.
            read_until2(&mut reader, b'\r', b'\n', &mut buf).await?;
            // An empty buffer means that EOF was reached.
            if buf.is_empty() {
                return Ok(());
            }
            // Without the lock, lines from different nodes get mixed.
            let stdout = std::io::stdout();
            let mut guard = stdout.lock();
            write!(guard, "{} ", self.colornode)?;
            let line = String::from_utf8_lossy(&buf);
            writeln!(guard, "{}", line.trim_end_matches(['\r', '\n']))?;
            buf.clear();
        }
    }
}

/// Like `read_until`, but stops at whichever of the two delimiters comes first.
/// The delimiter is kept in `buf`.
async fn read_until2<B: AsyncRead + Unpin>(
    reader: &mut BufReader<B>,
    delimiter1: u8,
    delimiter2: u8,
    buf: &mut Vec<u8>,
) -> std::io::Result<()> {
    loop {
        let (done, used) = {
            let available = reader.fill_buf().await?;
            if let Some(i) = memchr::memchr2(delimiter1, delimiter2, available) {
                buf.extend_from_slice(&available[..=i]);
                (true, i + 1)
            } else {
                buf.extend_from_slice(available);
                (false, available.len())
            }
        };
        reader.consume(used);
        if done || used == 0 {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_until2_splits_on_either_delimiter() {
        let data: &[u8] = b"10%\r20%\rdone\nlast";
        let mut reader = BufReader::new(data);
        let mut lines = vec![];
        loop {
            let mut buf = vec![];
            read_until2(&mut reader, b'\r', b'\n', &mut buf).await.unwrap();
            if buf.is_empty() {
                break;
            }
            lines.push(String::from_utf8(buf).unwrap());
        }
        assert_eq!(lines, vec!["10%\r", "20%\r", "done\n", "last"]);
    }
}
