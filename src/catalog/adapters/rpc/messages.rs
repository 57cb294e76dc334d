//! JSON-RPC 2.0 message shapes used during discovery.

use crate::catalog::domain::{ProbeError, ServerInfo, ToolSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision advertised in `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// JSON-RPC code for an unknown method.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Outgoing request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    jsonrpc: &'static str,
    /// Request identifier.
    pub id: u64,
    /// Method name.
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a request.
    #[must_use]
    pub const fn new(id: u64, method: &'static str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// Outgoing notification.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    jsonrpc: &'static str,
    /// Method name.
    pub method: &'static str,
}

impl JsonRpcNotification {
    /// Creates a parameterless notification.
    #[must_use]
    pub const fn new(method: &'static str) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
        }
    }
}

/// Incoming message that may answer a request.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    /// Identifier echoed from the request; absent for notifications.
    #[serde(default)]
    pub id: Option<Value>,
    /// Method name, present when the server sends its own request.
    #[serde(default)]
    pub method: Option<String>,
    /// Successful result.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error object.
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

impl JsonRpcResponse {
    /// Whether this message answers the request with `id`.
    #[must_use]
    pub fn answers(&self, id: u64) -> bool {
        self.method.is_none() && self.id.as_ref().and_then(Value::as_u64) == Some(id)
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcErrorObject {
    /// Error code.
    pub code: i64,
    /// Error message.
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeResult {
    #[serde(default)]
    server_info: Option<ServerInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolsListResult {
    #[serde(default)]
    tools: Vec<RawTool>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTool {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    input_schema: Option<Value>,
}

/// One page of a tool listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPage {
    /// Tools on this page.
    pub tools: Vec<ToolSchema>,
    /// Cursor for the following page.
    pub next_cursor: Option<String>,
}

/// Builds `initialize` parameters.
#[must_use]
pub fn initialize_params() -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

/// Builds `tools/list` parameters for an optional cursor.
#[must_use]
pub fn tools_list_params(cursor: Option<&str>) -> Option<Value> {
    cursor.map(|cursor| serde_json::json!({ "cursor": cursor }))
}

/// Reads the server identity from an `initialize` result.
///
/// # Errors
///
/// Returns a protocol [`ProbeError`] when the result is not an object.
pub fn parse_initialize(result: Value) -> Result<Option<ServerInfo>, ProbeError> {
    let parsed: InitializeResult = serde_json::from_value(result)
        .map_err(|err| ProbeError::protocol(format!("malformed initialize result: {err}")))?;
    Ok(parsed.server_info)
}

/// Reads one page of a `tools/list` result.
///
/// A tool without an `inputSchema` is given an empty object schema.
///
/// # Errors
///
/// Returns a protocol [`ProbeError`] for a malformed result, a tool without
/// a name, or a tool whose input schema is not an object.
pub fn parse_tool_page(result: Value) -> Result<ToolPage, ProbeError> {
    let parsed: ToolsListResult = serde_json::from_value(result)
        .map_err(|err| ProbeError::protocol(format!("malformed tools/list result: {err}")))?;

    let tools = parsed
        .tools
        .into_iter()
        .map(|raw| {
            let name = raw
                .name
                .ok_or_else(|| ProbeError::protocol("tool entry has no name"))?;
            let schema = raw
                .input_schema
                .unwrap_or_else(|| serde_json::json!({ "type": "object" }));
            ToolSchema::new(name, raw.description.unwrap_or_default(), schema)
                .map_err(|err| ProbeError::protocol(err.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ToolPage {
        tools,
        next_cursor: parsed.next_cursor.filter(|cursor| !cursor.is_empty()),
    })
}
