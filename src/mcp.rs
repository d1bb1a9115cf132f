//! MCP (Model Context Protocol) JSON-RPC handler.
//!
//! Implements the [MCP specification](https://spec.modelcontextprotocol.io/)
//! over stdio. Reads JSON-RPC 2.0 requests from stdin (one per line) and
//! writes responses to stdout.
//!
//! ## Supported methods
//!
//! | Method         | Description                          |
//! |----------------|--------------------------------------|
//! | `initialize`   | Handshake, returns capabilities      |
//! | `tools/list`   | List available tool definitions      |
//! | `tools/call`   | Execute a tool and return result     |
//! | `prompts/list` | List prompt templates                |
//! | `prompts/get`  | Render a prompt with its arguments   |
//! | `ping`         | Liveness check                       |
//!
//! Notifications (`notifications/initialized`, `notifications/cancelled`) are
//! acknowledged silently.

use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::prompts;
use crate::tools::ToolRegistry;
use crate::transport::Connector;

const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

/// Name and version reported in `initialize`.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Run the MCP server on stdio, processing JSON-RPC requests until EOF.
pub async fn run_stdio<C: Connector>(info: ServerInfo, registry: ToolRegistry<C>) {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    tracing::info!("{} {} listening on stdio", info.name, info.version);

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                tracing::error!("stdin read error: {}", e);
                break;
            }
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(trimmed) {
            Ok(request) => handle_request(&info, &registry, &request).await,
            Err(e) => Some(error_response(
                Some(Value::Null),
                PARSE_ERROR,
                format!("Parse error: {}", e),
            )),
        };

        if let Some(response) = response {
            write_response(&mut stdout, &response).await;
        }
    }

    tracing::info!("stdin closed, shutting down");
}

/// Handle one decoded message. Notifications yield `None`.
pub async fn handle_request<C: Connector>(
    info: &ServerInfo,
    registry: &ToolRegistry<C>,
    request: &Value,
) -> Option<Value> {
    let id = request.get("id").cloned();
    let method = request.get("method").and_then(Value::as_str).unwrap_or("");

    // Notifications (no id) are acknowledged silently
    if id.is_none() {
        match method {
            "notifications/initialized" | "notifications/cancelled" => {}
            _ => tracing::debug!("unknown notification: {}", method),
        }
        return None;
    }

    let response = match method {
        "initialize" => handle_initialize(info),
        "tools/list" => json!({
            "jsonrpc": "2.0",
            "result": { "tools": registry.definitions() }
        }),
        "tools/call" => handle_tools_call(request, registry).await,
        "prompts/list" => json!({
            "jsonrpc": "2.0",
            "result": { "prompts": prompts::definitions() }
        }),
        "prompts/get" => handle_prompts_get(request, registry),
        "ping" => json!({ "jsonrpc": "2.0", "result": {} }),
        _ => error_response(None, METHOD_NOT_FOUND, format!("Method not found: {}", method)),
    };

    Some(inject_id(response, id))
}

/// Handle `initialize`: return protocol version, capabilities, and server info.
fn handle_initialize(info: &ServerInfo) -> Value {
    json!({
        "jsonrpc": "2.0",
        "result": {
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "prompts": { "listChanged": false }
            },
            "serverInfo": {
                "name": info.name,
                "version": info.version
            }
        }
    })
}

/// Handle `tools/call` by dispatching to the registry.
async fn handle_tools_call<C: Connector>(request: &Value, registry: &ToolRegistry<C>) -> Value {
    let params = request.get("params").cloned().unwrap_or(json!({}));
    let name = params.get("name").and_then(Value::as_str).unwrap_or("");
    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    tracing::debug!("tools/call {}", name);
    let result = registry.call(name, args).await;
    if result.is_error {
        tracing::warn!("tool {} failed", name);
    }

    let mut response_result = json!({
        "content": result.content
    });
    if result.is_error {
        response_result["isError"] = json!(true);
    }

    json!({
        "jsonrpc": "2.0",
        "result": response_result
    })
}

/// Handle `prompts/get`: render a prompt or fail with invalid params.
fn handle_prompts_get<C: Connector>(request: &Value, registry: &ToolRegistry<C>) -> Value {
    let params = request.get("params").cloned().unwrap_or(json!({}));
    let name = params.get("name").and_then(Value::as_str).unwrap_or("");
    let args = params
        .get("arguments")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_else(Map::new);

    match prompts::render(name, &args, registry.tools().scenarios()) {
        Ok((description, text)) => json!({
            "jsonrpc": "2.0",
            "result": {
                "description": description,
                "messages": [{
                    "role": "user",
                    "content": { "type": "text", "text": text }
                }]
            }
        }),
        Err(e) => error_response(None, INVALID_PARAMS, e.to_string()),
    }
}

fn error_response(id: Option<Value>, code: i64, message: String) -> Value {
    let mut response = json!({
        "jsonrpc": "2.0",
        "error": {
            "code": code,
            "message": message
        }
    });
    if let Some(id) = id {
        response["id"] = id;
    }
    response
}

/// Inject the request `id` into a response object.
fn inject_id(mut response: Value, id: Option<Value>) -> Value {
    if let Some(id) = id {
        response["id"] = id;
    }
    response
}

/// Write a JSON-RPC response to stdout (one line, flushed immediately).
async fn write_response(stdout: &mut tokio::io::Stdout, response: &Value) {
    let mut output = serde_json::to_string(response).unwrap_or_default();
    output.push('\n');
    if let Err(e) = stdout.write_all(output.as_bytes()).await {
        tracing::error!("stdout write error: {}", e);
    }
    if let Err(e) = stdout.flush().await {
        tracing::error!("stdout flush error: {}", e);
    }
}
