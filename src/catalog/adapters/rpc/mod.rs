//! Discovery over the MCP JSON-RPC protocol.
//!
//! One attempt opens a channel to the server, performs the `initialize`
//! handshake, sends `notifications/initialized`, and pages through
//! `tools/list`. Channels exist for STDIO child processes and streamable
//! HTTP endpoints.

mod http;
mod messages;
mod stdio;

pub use messages::{METHOD_NOT_FOUND, PROTOCOL_VERSION};

use crate::catalog::{
    domain::{
        NO_VALID_LOCATION, ProbeError, ProbeResult, ServerEntry, ServerInfo, ServerLocation,
        ToolSchema,
    },
    ports::DiscoveryProber,
};
use async_trait::async_trait;
use http::HttpChannel;
use messages::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use serde_json::Value;
use std::time::{Duration, Instant};
use stdio::StdioChannel;
use tracing::{debug, info};

/// Upper bound on `tools/list` pages followed in one attempt.
pub const MAX_TOOL_PAGES: usize = 64;

/// Bidirectional JSON-RPC exchange with one server.
#[async_trait]
trait RpcChannel: Send {
    /// Sends `request` and waits for the message answering it.
    async fn call(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, ProbeError>;

    /// Sends a notification.
    async fn notify(&mut self, notification: &JsonRpcNotification) -> Result<(), ProbeError>;
}

enum CallOutcome {
    Result(Value),
    MethodNotFound,
}

struct Session<C> {
    channel: C,
    next_id: u64,
}

impl<C: RpcChannel> Session<C> {
    const fn new(channel: C) -> Self {
        Self {
            channel,
            next_id: 1,
        }
    }

    async fn call(
        &mut self,
        method: &'static str,
        params: Option<Value>,
    ) -> Result<CallOutcome, ProbeError> {
        let request = JsonRpcRequest::new(self.next_id, method, params);
        self.next_id += 1;
        let response = self.channel.call(&request).await?;

        if let Some(error) = response.error {
            if error.code == METHOD_NOT_FOUND {
                return Ok(CallOutcome::MethodNotFound);
            }
            return Err(ProbeError::protocol(format!(
                "{method} failed: {} (code={})",
                error.message, error.code
            )));
        }
        response
            .result
            .map(CallOutcome::Result)
            .ok_or_else(|| ProbeError::protocol(format!("{method} reply has no result")))
    }

    async fn discover(&mut self) -> Result<(Option<ServerInfo>, Vec<ToolSchema>), ProbeError> {
        let server_info = match self
            .call("initialize", Some(messages::initialize_params()))
            .await?
        {
            CallOutcome::Result(result) => messages::parse_initialize(result)?,
            CallOutcome::MethodNotFound => {
                return Err(ProbeError::protocol("server does not implement initialize"));
            }
        };
        self.channel
            .notify(&JsonRpcNotification::new("notifications/initialized"))
            .await?;

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_TOOL_PAGES {
            let params = messages::tools_list_params(cursor.as_deref());
            let page = match self.call("tools/list", params).await? {
                CallOutcome::Result(result) => messages::parse_tool_page(result)?,
                CallOutcome::MethodNotFound => return Ok((server_info, tools)),
            };
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok((server_info, tools)),
            }
        }
        Err(ProbeError::protocol(format!(
            "tools/list pagination exceeded {MAX_TOOL_PAGES} pages"
        )))
    }
}

/// Prober that speaks MCP JSON-RPC to the configured location.
#[derive(Debug, Clone)]
pub struct RpcDiscoveryProber {
    http: reqwest::Client,
}

impl RpcDiscoveryProber {
    /// Creates a prober with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error when the HTTP client cannot be built.
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }

    async fn attempt(
        &self,
        location: &ServerLocation,
    ) -> Result<(Option<ServerInfo>, Vec<ToolSchema>), ProbeError> {
        match location {
            ServerLocation::Stdio(command) => {
                let channel = StdioChannel::spawn(command)?;
                Session::new(channel).discover().await
            }
            ServerLocation::Http(url) => {
                let channel = HttpChannel::new(self.http.clone(), url.clone());
                Session::new(channel).discover().await
            }
        }
    }
}

#[async_trait]
impl DiscoveryProber for RpcDiscoveryProber {
    async fn probe(&self, entry: &ServerEntry, timeout: Duration) -> ProbeResult {
        let location = match entry.parsed_location() {
            Some(Ok(location)) => location,
            Some(Err(error)) => {
                debug!(server = %entry.name(), %error, "location unusable, skipping");
                return ProbeResult::skipped(NO_VALID_LOCATION);
            }
            None => return ProbeResult::skipped(NO_VALID_LOCATION),
        };

        info!(
            server = %entry.name(),
            transport = location.transport(),
            "probing server"
        );
        let started = Instant::now();
        let outcome = tokio::time::timeout(timeout, self.attempt(&location)).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(Ok((server_info, tools))) => {
                let result = ProbeResult::success(tools, elapsed);
                match server_info {
                    Some(info) => result.with_server_info(info),
                    None => result,
                }
            }
            Ok(Err(error)) => ProbeResult::failure(error, elapsed),
            Err(_) => ProbeResult::failure(
                ProbeError::transport(format!("timed out after {}ms", timeout.as_millis())),
                elapsed,
            ),
        }
    }
}
