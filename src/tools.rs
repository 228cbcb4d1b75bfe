//! MCP tool definitions and handlers.
//!
//! The server advertises a fixed set of read-only tools:
//!
//! - `enumerate_devices` — list every device on the YoLink account
//! - `get_device_status` — fetch the current state of one device
//!
//! Arguments are validated into a [`ToolCall`] before anything touches the
//! network. Upstream failures come back as a [`ToolResult`] with
//! `isError: true`; only a failure to encode the result is a [`ToolError`].

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{error, Span};

use crate::client::YoLinkClient;

/// A tool advertised in `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The tools this server knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    EnumerateDevices,
    GetDeviceStatus,
}

impl Tool {
    pub const ALL: [Tool; 2] = [Tool::EnumerateDevices, Tool::GetDeviceStatus];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Tool::EnumerateDevices => "enumerate_devices",
            Tool::GetDeviceStatus => "get_device_status",
        }
    }

    pub fn descriptor(self) -> ToolDescriptor {
        match self {
            Tool::EnumerateDevices => ToolDescriptor {
                name: self.name(),
                description: "List all YoLink devices in the account",
                input_schema: json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
            Tool::GetDeviceStatus => ToolDescriptor {
                name: self.name(),
                description: "Get the current status of a specific YoLink device",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "device_id": {
                            "type": "string",
                            "description": "The ID of the device to get status for"
                        }
                    },
                    "required": ["device_id"]
                }),
            },
        }
    }
}

/// Returns all tool definitions, in advertising order.
pub fn all_tool_definitions() -> Vec<ToolDescriptor> {
    Tool::ALL.into_iter().map(Tool::descriptor).collect()
}

/// A tool invocation with validated arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    EnumerateDevices,
    GetDeviceStatus { device_id: String },
}

impl ToolCall {
    /// Validate `args` for `tool`. The error is the text shown to the agent.
    pub fn parse(tool: Tool, args: &Map<String, Value>) -> Result<Self, String> {
        match tool {
            Tool::EnumerateDevices => Ok(ToolCall::EnumerateDevices),
            Tool::GetDeviceStatus => match args.get("device_id") {
                None => Err("Missing required parameter: device_id".into()),
                Some(Value::String(id)) => Ok(ToolCall::GetDeviceStatus {
                    device_id: id.clone(),
                }),
                Some(_) => Err("device_id must be a string".into()),
            },
        }
    }
}

/// One MCP content block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// Result of an MCP tool call, ready to be serialized into a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub content: Vec<Content>,
    /// Maps to `isError`; omitted on success.
    #[serde(rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    fn text(text: String) -> Self {
        Self {
            content: vec![Content::Text { text }],
            is_error: false,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            content: vec![Content::Text { text: message }],
            is_error: true,
        }
    }
}

/// A tool handler failed outright (as opposed to reporting `isError`).
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Handle a tool call and return MCP content.
pub async fn handle_tool_call(
    tool: Tool,
    args: &Map<String, Value>,
    client: &mut YoLinkClient,
    log: &Span,
) -> Result<ToolResult, ToolError> {
    let call = match ToolCall::parse(tool, args) {
        Ok(call) => call,
        Err(msg) => return Ok(ToolResult::error(msg)),
    };

    match call {
        ToolCall::EnumerateDevices => handle_enumerate_devices(client, log).await,
        ToolCall::GetDeviceStatus { device_id } => {
            handle_get_device_status(&device_id, client, log).await
        }
    }
}

async fn handle_enumerate_devices(
    client: &mut YoLinkClient,
    log: &Span,
) -> Result<ToolResult, ToolError> {
    let devices = match client.list_devices().await {
        Ok(d) => d,
        Err(e) => {
            error!(parent: log, tool = "enumerate_devices", error = %e, "Tool call failed");
            return Ok(ToolResult::error(format!(
                "Failed to enumerate devices: {e}"
            )));
        }
    };

    let pretty = serde_json::to_string_pretty(&devices).map_err(|source| ToolError::Encode {
        what: "device list",
        source,
    })?;
    Ok(ToolResult::text(format!(
        "Found {} YoLink devices:\n\n{}",
        devices.len(),
        pretty
    )))
}

async fn handle_get_device_status(
    device_id: &str,
    client: &mut YoLinkClient,
    log: &Span,
) -> Result<ToolResult, ToolError> {
    let status = match client.get_device_status(device_id).await {
        Ok(s) => s,
        Err(e) => {
            error!(parent: log, tool = "get_device_status", device_id, error = %e, "Tool call failed");
            return Ok(ToolResult::error(format!(
                "Failed to get device status: {e}"
            )));
        }
    };

    let pretty = serde_json::to_string_pretty(&status).map_err(|source| ToolError::Encode {
        what: "device status",
        source,
    })?;
    Ok(ToolResult::text(format!(
        "Status for device {device_id}:\n\n{pretty}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn two_tools_advertised() {
        let names: Vec<_> = all_tool_definitions().iter().map(|t| t.name).collect();
        assert_eq!(names, ["enumerate_devices", "get_device_status"]);
    }

    #[test]
    fn descriptor_serializes_input_schema_key() {
        let value = serde_json::to_value(Tool::GetDeviceStatus.descriptor()).unwrap();
        assert_eq!(value["inputSchema"]["required"], json!(["device_id"]));
        assert_eq!(
            value["inputSchema"]["properties"]["device_id"]["type"],
            json!("string")
        );
    }

    #[test]
    fn from_name_round_trips() {
        for tool in Tool::ALL {
            assert_eq!(Tool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(Tool::from_name("set_device_state"), None);
    }

    #[test]
    fn device_id_is_required_and_must_be_string() {
        let err = ToolCall::parse(Tool::GetDeviceStatus, &Map::new()).unwrap_err();
        assert_eq!(err, "Missing required parameter: device_id");

        let err = ToolCall::parse(Tool::GetDeviceStatus, &args(json!({ "device_id": 5 })))
            .unwrap_err();
        assert_eq!(err, "device_id must be a string");

        let call =
            ToolCall::parse(Tool::GetDeviceStatus, &args(json!({ "device_id": "d1" }))).unwrap();
        assert_eq!(
            call,
            ToolCall::GetDeviceStatus {
                device_id: "d1".into()
            }
        );
    }

    #[test]
    fn enumerate_ignores_arguments() {
        let call = ToolCall::parse(Tool::EnumerateDevices, &args(json!({ "extra": true }))).unwrap();
        assert_eq!(call, ToolCall::EnumerateDevices);
    }

    #[test]
    fn is_error_omitted_on_success() {
        let ok = serde_json::to_value(ToolResult::text("hi".into())).unwrap();
        assert_eq!(ok, json!({ "content": [{ "type": "text", "text": "hi" }] }));

        let err = serde_json::to_value(ToolResult::error("boom".into())).unwrap();
        assert_eq!(
            err,
            json!({ "content": [{ "type": "text", "text": "boom" }], "isError": true })
        );
    }
}
