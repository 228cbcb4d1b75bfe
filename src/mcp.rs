//! YoLink MCP router and stdio transport.
//!
//! [`Server`] turns one request line into at most one response line. It knows
//! `initialize`, `tools/list`, `tools/call` and `ping`; any other method is
//! answered with -32601. Malformed input gets -32700 with a `null` id since
//! the request id could not be read.
//!
//! `tools/call` failures split into two channels: a bad `name`/`arguments`
//! shape is a JSON-RPC error, while anything the YoLink cloud rejects comes
//! back as a normal result with `isError: true`.
//!
//! Id-less `notifications/*` messages are logged and never answered.
//!
//! [`serve`] drives the loop: read a line, answer it (upstream round trips
//! included), flush, then read the next.

use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, warn, Span};

use crate::client::YoLinkClient;
use crate::jsonrpc::{ErrorCode, Request, Response, RpcError, JSONRPC_VERSION};
use crate::tools::{self, Tool, ToolDescriptor};

pub const SERVER_NAME: &str = "yolink-mcp-server";
pub const SERVER_VERSION: &str = "1.0.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC request router backed by a [`YoLinkClient`].
pub struct Server {
    client: YoLinkClient,
    tools: Vec<ToolDescriptor>,
    log: Span,
}

impl Server {
    pub fn new(client: YoLinkClient, log: Span) -> Self {
        Self {
            client,
            tools: tools::all_tool_definitions(),
            log,
        }
    }

    /// Handle one raw request line and return the response line.
    ///
    /// Never fails: every problem becomes a JSON-RPC error object. Returns
    /// `None` only for notifications, which get no reply.
    pub async fn handle(&mut self, line: &str) -> Option<String> {
        let request = match Request::parse(line) {
            Ok(r) => r,
            Err(e) => {
                warn!(parent: &self.log, error = %e, "Failed to parse request");
                return Some(Response::error(Value::Null, RpcError::parse_error()).to_line());
            }
        };

        if request.is_notification() && request.method.starts_with("notifications/") {
            debug!(parent: &self.log, method = %request.method, "Notification received");
            return None;
        }

        if request.jsonrpc.as_deref() != Some(JSONRPC_VERSION) {
            debug!(parent: &self.log, jsonrpc = ?request.jsonrpc, "Unexpected jsonrpc version tag");
        }
        debug!(parent: &self.log, method = %request.method, "Handling request");
        let id = request.response_id();
        let response = match self.dispatch(&request).await {
            Ok(result) => Response::result(id, result),
            Err(err) => Response::error(id, err),
        };
        Some(response.to_line())
    }

    async fn dispatch(&mut self, request: &Request) -> Result<Value, RpcError> {
        match request.method.as_str() {
            "initialize" => Ok(handle_initialize()),
            "tools/list" => Ok(json!({ "tools": self.tools })),
            "tools/call" => self.handle_tools_call(request.params.as_ref()).await,
            "ping" => Ok(json!({})),
            other => Err(RpcError::method_not_found(other)),
        }
    }

    /// Handle `tools/call` — validate params and dispatch to the tool handler.
    async fn handle_tools_call(
        &mut self,
        params: Option<&Map<String, Value>>,
    ) -> Result<Value, RpcError> {
        let empty = Map::new();
        let params = params.unwrap_or(&empty);

        let name = match params.get("name") {
            None => return Err(RpcError::invalid_params("Missing 'name' parameter")),
            Some(Value::String(name)) => name.as_str(),
            Some(_) => return Err(RpcError::invalid_params("Invalid 'name' parameter type")),
        };

        let args = match params.get("arguments") {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(args)) => args,
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "Invalid 'arguments' parameter type",
                ))
            }
        };

        let Some(tool) = Tool::from_name(name) else {
            return Err(RpcError::new(
                ErrorCode::MethodNotFound,
                format!("Unknown tool: {name}"),
            ));
        };

        let result = tools::handle_tool_call(tool, args, &mut self.client, &self.log)
            .await
            .map_err(|e| {
                error!(parent: &self.log, tool = name, error = %e, "Tool execution failed");
                RpcError::internal(format!("Tool execution failed: {e}"))
            })?;

        serde_json::to_value(result)
            .map_err(|e| RpcError::internal(format!("Tool execution failed: {e}")))
    }
}

/// Handle `initialize` — return protocol version, capabilities, and server info.
fn handle_initialize() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION
        }
    })
}

/// Run the MCP server on stdio, processing JSON-RPC requests until EOF.
pub async fn run_stdio(server: &mut Server) -> std::io::Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(server, stdin, stdout).await
}

/// Serve requests from `reader` until EOF, writing responses to `writer`.
///
/// A read error is returned to the caller; lines that are not valid UTF-8 are
/// logged and skipped; write errors are logged.
pub async fn serve<R, W>(server: &mut Server, mut reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(()); // EOF
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(l) => l.trim(),
            Err(e) => {
                warn!(parent: &server.log, error = %e, "Skipping non-UTF-8 input line");
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        let Some(response) = server.handle(line).await else {
            continue;
        };
        if let Err(e) = write_line(&mut writer, &response).await {
            error!(parent: &server.log, error = %e, "Failed to write response");
        }
    }
}

/// Emit `line` plus the newline frame and flush so the host sees it now.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
