//! Streamable HTTP channel.
//!
//! Each message is POSTed to the endpoint. A reply is either a single JSON
//! body or an event stream whose `data` payloads carry JSON-RPC messages.

use super::RpcChannel;
use super::messages::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::catalog::domain::ProbeError;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

const SESSION_HEADER: &str = "mcp-session-id";
const ACCEPT_BOTH: &str = "application/json, text/event-stream";

pub(super) struct HttpChannel {
    client: reqwest::Client,
    endpoint: Url,
    session: Option<HeaderValue>,
}

impl HttpChannel {
    pub(super) const fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self {
            client,
            endpoint,
            session: None,
        }
    }

    async fn post(
        &mut self,
        message: &(impl Serialize + Sync),
    ) -> Result<reqwest::Response, ProbeError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(ACCEPT, ACCEPT_BOTH)
            .json(message);
        if let Some(session) = &self.session {
            request = request.header(SESSION_HEADER, session.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|err| ProbeError::transport(format!("request failed: {err}")))?;
        if let Some(session) = response.headers().get(SESSION_HEADER) {
            self.session = Some(session.clone());
        }
        Ok(response)
    }
}

#[async_trait]
impl RpcChannel for HttpChannel {
    async fn call(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, ProbeError> {
        let mut response = self.post(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(request.method, status));
        }

        if is_event_stream(&response) {
            let mut events = EventStream::default();
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|err| ProbeError::transport(format!("event stream failed: {err}")))?
            {
                for data in events.push(&chunk) {
                    if let Some(answer) = answer_from(&data, request.id)? {
                        return Ok(answer);
                    }
                }
            }
            for data in events.finish() {
                if let Some(answer) = answer_from(&data, request.id)? {
                    return Ok(answer);
                }
            }
            return Err(ProbeError::transport(
                "event stream ended without a reply",
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| ProbeError::transport(format!("reading reply failed: {err}")))?;
        let message: JsonRpcResponse = serde_json::from_slice(&body)
            .map_err(|err| ProbeError::protocol(format!("server sent invalid JSON: {err}")))?;
        if message.answers(request.id) {
            Ok(message)
        } else {
            Err(ProbeError::protocol("reply does not match the request id"))
        }
    }

    async fn notify(&mut self, notification: &JsonRpcNotification) -> Result<(), ProbeError> {
        let response = self.post(notification).await?;
        let status = response.status();
        // Servers differ on notification replies; only transport errors matter.
        if !status.is_success() {
            debug!(method = notification.method, %status, "notification not accepted");
        }
        Ok(())
    }
}

/// Server errors, `408` and `429` may clear up on retry; other statuses
/// mean the endpoint does not serve this protocol.
fn status_error(method: &str, status: StatusCode) -> ProbeError {
    let detail = format!("{method} answered HTTP {status}");
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        ProbeError::transport(detail)
    } else {
        ProbeError::protocol(detail)
    }
}

fn is_event_stream(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/event-stream"))
}

fn answer_from(data: &str, id: u64) -> Result<Option<JsonRpcResponse>, ProbeError> {
    let message: JsonRpcResponse = serde_json::from_str(data)
        .map_err(|err| ProbeError::protocol(format!("event carried invalid JSON: {err}")))?;
    if message.answers(id) {
        Ok(Some(message))
    } else {
        trace!(method = ?message.method, "ignoring unrelated event");
        Ok(None)
    }
}

/// Incremental parser for `text/event-stream` bodies.
///
/// Yields the joined `data` lines of each complete event.
#[derive(Debug, Default)]
pub(super) struct EventStream {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl EventStream {
    pub(super) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(position) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=position).collect();
            let decoded = String::from_utf8_lossy(&raw);
            let line = decoded.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.accept_line(line) {
                events.push(event);
            }
        }
        events
    }

    pub(super) fn finish(&mut self) -> Vec<String> {
        let remainder = std::mem::take(&mut self.buffer);
        let mut events = Vec::new();
        if !remainder.is_empty() {
            let line = String::from_utf8_lossy(&remainder).into_owned();
            if let Some(event) = self.accept_line(line.trim_end_matches('\r')) {
                events.push(event);
            }
        }
        if let Some(event) = self.accept_line("") {
            events.push(event);
        }
        events
    }

    fn accept_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.data).join("\n"));
        }
        if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_owned());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::EventStream;

    #[test]
    fn events_are_split_on_blank_lines() {
        let mut stream = EventStream::default();
        let events = stream.push(b"event: message\ndata: {\"id\":1}\n\ndata: {\"id\":2}\n\n");
        assert_eq!(events, vec!["{\"id\":1}".to_owned(), "{\"id\":2}".to_owned()]);
    }

    #[test]
    fn events_survive_chunk_boundaries_and_crlf() {
        let mut stream = EventStream::default();
        assert!(stream.push(b"data: {\"jsonrpc\":").is_empty());
        assert!(stream.push(b"\"2.0\"}\r\n").is_empty());
        let events = stream.push(b"\r\n");
        assert_eq!(events, vec!["{\"jsonrpc\":\"2.0\"}".to_owned()]);
    }

    #[test]
    fn multi_line_data_is_joined() {
        let mut stream = EventStream::default();
        let events = stream.push(b"data: first\ndata: second\n\n");
        assert_eq!(events, vec!["first\nsecond".to_owned()]);
    }

    #[test]
    fn unterminated_event_is_flushed_on_finish() {
        let mut stream = EventStream::default();
        assert!(stream.push(b"data: tail").is_empty());
        assert_eq!(stream.finish(), vec!["tail".to_owned()]);
    }

    #[test]
    fn comments_and_other_fields_are_ignored() {
        let mut stream = EventStream::default();
        let events = stream.push(b": keep-alive\nid: 7\nretry: 100\n\n");
        assert!(events.is_empty());
    }
}
