//! MCP server over stdio.
//!
//! One JSON-RPC message per line on stdin, one response per line on stdout.
//! Notifications get no response. All logging goes to stderr.

use std::sync::Arc;

use anyhow::{Context, Result};
use gcalendar_core::protocol::{
    CallToolParams, INTERNAL_ERROR, INVALID_PARAMS, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    MCP_PROTOCOL_VERSION, METHOD_INITIALIZE, METHOD_NOT_FOUND, METHOD_PING, METHOD_TOOLS_CALL,
    METHOD_TOOLS_LIST, PARSE_ERROR, ServerInfo,
};
use gcalendar_core::{Settings, TokenPaths, TokenStore};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::auth::{CredentialManager, OAuthClient};
use crate::dispatch::Dispatcher;
use crate::google::GoogleCalendar;
use crate::tools::{ToolContext, ToolRegistry};

pub const SERVER_NAME: &str = "gcalendar-mcp";

pub struct McpServer {
    dispatcher: Dispatcher,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Wire up the live Google client from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let store = TokenStore::new(TokenPaths::from_settings(settings));
        let credentials = Arc::new(CredentialManager::new(OAuthClient::from(settings), store));
        let api = Arc::new(GoogleCalendar::new(credentials.clone())?);

        let context = ToolContext { api, credentials };
        Ok(Self::new(Dispatcher::new(ToolRegistry::builtin(), context)))
    }

    /// Serve until the reader hits end of input.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
            if line.trim().is_empty() {
                continue;
            }

            let Some(response) = self.handle_line(&line).await else {
                continue;
            };

            let mut out = serde_json::to_string(&response)?;
            out.push('\n');
            writer.write_all(out.as_bytes()).await?;
            writer.flush().await?;
        }

        tracing::info!("stdin closed, shutting down");
        Ok(())
    }

    /// Response for one input line, or `None` for a notification.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Unparseable message: {}", e);
                return Some(JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        if request.is_notification() {
            tracing::debug!(method = %request.method, "notification");
            return None;
        }

        Some(self.handle_request(request).await)
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id;

        match request.method.as_str() {
            METHOD_INITIALIZE => {
                let client_version = request
                    .params
                    .as_ref()
                    .and_then(|p| p.get("protocolVersion"))
                    .and_then(Value::as_str)
                    .unwrap_or(MCP_PROTOCOL_VERSION);

                let result = InitializeResult {
                    protocol_version: client_version.to_string(),
                    capabilities: json!({ "tools": {} }),
                    server_info: ServerInfo {
                        name: SERVER_NAME.to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                    },
                };

                match serde_json::to_value(result) {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
                }
            }
            METHOD_PING => JsonRpcResponse::success(id, json!({})),
            METHOD_TOOLS_LIST => {
                JsonRpcResponse::success(id, json!({ "tools": self.dispatcher.descriptors() }))
            }
            METHOD_TOOLS_CALL => {
                let params: CallToolParams = match request
                    .params
                    .map(serde_json::from_value)
                    .transpose()
                {
                    Ok(Some(params)) => params,
                    Ok(None) => {
                        return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params");
                    }
                    Err(e) => {
                        return JsonRpcResponse::error(
                            id,
                            INVALID_PARAMS,
                            format!("Invalid params: {}", e),
                        );
                    }
                };

                let response = self
                    .dispatcher
                    .dispatch(&params.name, params.arguments.unwrap_or_default())
                    .await;

                JsonRpcResponse::success(id, response.to_result())
            }
            other => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            ),
        }
    }
}

/// Run the server on the process's stdin/stdout.
pub async fn run(settings: &Settings) -> Result<()> {
    let server = McpServer::from_settings(settings)?;

    tracing::info!("Google Calendar MCP Server running");

    server
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
}
