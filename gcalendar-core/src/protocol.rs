//! Defines the JSON-RPC messages exchanged with an MCP client over
//! stdin/stdout, and the tool descriptor/response shapes carried inside them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const JSONRPC_VERSION: &str = "2.0";
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_PING: &str = "ping";
pub const METHOD_TOOLS_LIST: &str = "tools/list";
pub const METHOD_TOOLS_CALL: &str = "tools/call";

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// Request sent from the MCP client. Requests without an `id` are notifications.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// Response sent back to the MCP client.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Static declaration of a callable tool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// Params of a `tools/call` request.
#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
}

/// Outcome of a single tool invocation.
///
/// Both variants go over the wire as a single text content block; errors
/// are only distinguishable by their `Error: ` prefix.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResponse {
    Success { text: String },
    Error { message: String },
}

impl ToolResponse {
    pub fn success(text: impl Into<String>) -> Self {
        ToolResponse::Success { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ToolResponse::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResponse::Error { .. })
    }

    pub fn text(&self) -> String {
        match self {
            ToolResponse::Success { text } => text.clone(),
            ToolResponse::Error { message } => format!("Error: {}", message),
        }
    }

    /// The `tools/call` result payload.
    pub fn to_result(&self) -> Value {
        serde_json::json!({
            "content": [{ "type": "text", "text": self.text() }]
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: Value,
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_tools_call_request() {
        let line = r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"list_events","arguments":{"calendarId":"work"}}}"#;
        let request: JsonRpcRequest = serde_json::from_str(line).unwrap();

        assert_eq!(request.method, METHOD_TOOLS_CALL);
        assert!(!request.is_notification());

        let params: CallToolParams = serde_json::from_value(request.params.unwrap()).unwrap();
        assert_eq!(params.name, "list_events");
        assert_eq!(params.arguments.unwrap()["calendarId"], "work");
    }

    #[test]
    fn test_notification_has_no_id() {
        let line = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        let request: JsonRpcRequest = serde_json::from_str(line).unwrap();
        assert!(request.is_notification());
    }

    #[test]
    fn test_error_response_shape() {
        let response = JsonRpcResponse::error(None, METHOD_NOT_FOUND, "Method not found");
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": { "code": -32601, "message": "Method not found" }
            })
        );
    }

    #[test]
    fn test_tool_response_envelopes_share_shape() {
        let ok = ToolResponse::success("[]").to_result();
        let err = ToolResponse::error("boom").to_result();

        assert_eq!(ok, json!({ "content": [{ "type": "text", "text": "[]" }] }));
        assert_eq!(
            err,
            json!({ "content": [{ "type": "text", "text": "Error: boom" }] })
        );
    }

    #[test]
    fn test_descriptor_uses_camel_case_schema_key() {
        let descriptor = ToolDescriptor {
            name: "get_colors",
            description: "Get available colors.",
            input_schema: json!({ "type": "object", "properties": {} }),
        };
        let value = serde_json::to_value(&descriptor).unwrap();
        assert!(value.get("inputSchema").is_some());
    }
}
