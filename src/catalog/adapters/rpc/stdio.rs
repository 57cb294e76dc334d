//! Newline-delimited JSON-RPC over a child process's standard streams.

use super::RpcChannel;
use super::messages::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::catalog::domain::{ProbeError, ProbeErrorKind, StdioLocation};
use async_trait::async_trait;
use serde::Serialize;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, trace};

/// Channel to a spawned server process.
///
/// The child is killed when the channel is dropped, so a timed-out or
/// abandoned attempt leaves no process behind.
pub(super) struct StdioChannel {
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl StdioChannel {
    pub(super) fn spawn(location: &StdioLocation) -> Result<Self, ProbeError> {
        debug!(
            program = location.program(),
            args = ?location.args(),
            "spawning stdio server"
        );
        let mut child = Command::new(location.program())
            .args(location.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| spawn_error(location.program(), &err))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProbeError::transport("child stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProbeError::transport("child stdout unavailable"))?;

        Ok(Self {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }

    async fn send(&mut self, message: &(impl Serialize + Sync)) -> Result<(), ProbeError> {
        let mut line = serde_json::to_vec(message)
            .map_err(|err| ProbeError::protocol(format!("cannot encode request: {err}")))?;
        line.push(b'\n');
        self.stdin
            .write_all(&line)
            .await
            .map_err(|err| ProbeError::transport(format!("write to server failed: {err}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|err| ProbeError::transport(format!("write to server failed: {err}")))
    }
}

#[async_trait]
impl RpcChannel for StdioChannel {
    async fn call(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, ProbeError> {
        self.send(request).await?;
        loop {
            let line = self
                .stdout
                .next_line()
                .await
                .map_err(|err| ProbeError::transport(format!("read from server failed: {err}")))?
                .ok_or_else(|| ProbeError::transport("server closed the stream"))?;
            if line.trim().is_empty() {
                continue;
            }
            let message: JsonRpcResponse = serde_json::from_str(&line).map_err(|err| {
                ProbeError::protocol(format!("server sent invalid JSON: {err}"))
            })?;
            if message.answers(request.id) {
                return Ok(message);
            }
            trace!(method = ?message.method, "ignoring unrelated message");
        }
    }

    async fn notify(&mut self, notification: &JsonRpcNotification) -> Result<(), ProbeError> {
        self.send(notification).await
    }
}

/// A missing or non-executable program will not appear on retry.
fn spawn_error(program: &str, err: &std::io::Error) -> ProbeError {
    let detail = format!("failed to spawn '{program}': {err}");
    match err.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => {
            ProbeError::new(ProbeErrorKind::Configuration, detail)
        }
        _ => ProbeError::transport(detail),
    }
}
