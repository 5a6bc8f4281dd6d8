//! MCP server over newline-delimited JSON-RPC on stdio

use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::prompts;
use super::protocol::{ErrorCode, JSONRPC_VERSION, JsonRpcRequest, JsonRpcResponse, McpError};
use super::tools::{ToolContext, ToolRegistry};
use crate::error::Result;

const PROTOCOL_VERSION: &str = "2025-06-18";
const SERVER_NAME: &str = "encoding-manager";

pub struct McpServer {
    registry: ToolRegistry,
    context: ToolContext,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, context: ToolContext) -> Self {
        Self { registry, context }
    }

    fn handle_initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "prompts": { "listChanged": false },
            },
            "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
        })
    }

    async fn handle_tools_call(&self, params: &Value) -> std::result::Result<Value, McpError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::new(ErrorCode::InvalidParams, "tools/call requires a tool name"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        log::debug!("Calling tool {}", name);
        let outcome = self.registry.call(&self.context, name, arguments).await?;
        Ok(outcome.into_result())
    }

    fn handle_prompts_get(&self, params: &Value) -> std::result::Result<Value, McpError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::new(ErrorCode::InvalidParams, "prompts/get requires a prompt name"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
        prompts::get(name, &arguments)
    }

    /// Handle one request. Notifications produce no response.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            if !request.method.starts_with("notifications/") {
                log::debug!("Ignoring notification {}", request.method);
            }
            return None;
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::failure(
                id,
                ErrorCode::InvalidRequest,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            ));
        }

        let result = match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.registry.list()),
            "tools/call" => self.handle_tools_call(&request.params).await,
            "prompts/list" => Ok(prompts::list()),
            "prompts/get" => self.handle_prompts_get(&request.params),
            other => Err(McpError::new(
                ErrorCode::MethodNotFound,
                format!("Method not found: {}", other),
            )),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::from_error(id, err),
        })
    }

    /// Serve requests from `reader` until EOF, one at a time in arrival order
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Value>(trimmed) {
                Err(_) => Some(JsonRpcResponse::failure(
                    Value::Null,
                    ErrorCode::ParseError,
                    "Parse error",
                )),
                Ok(parsed) => match serde_json::from_value::<JsonRpcRequest>(parsed) {
                    Err(_) => Some(JsonRpcResponse::failure(
                        Value::Null,
                        ErrorCode::InvalidRequest,
                        "Invalid request",
                    )),
                    Ok(request) => self.handle(request).await,
                },
            };

            if let Some(response) = response {
                let payload = match serde_json::to_string(&response) {
                    Ok(payload) => payload,
                    Err(err) => serde_json::to_string(&JsonRpcResponse::failure(
                        response.id.clone(),
                        ErrorCode::InternalError,
                        format!("Failed to encode response: {}", err),
                    ))?,
                };
                writer.write_all(payload.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        log::info!("Input closed, stopping server");
        Ok(())
    }

    pub async fn serve_stdio(&self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::BufWriter::new(tokio::io::stdout());
        self.serve(stdin, stdout).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::{MockEncodingClient, MockMovieClient};

    fn server() -> McpServer {
        let context = ToolContext {
            encoding: Arc::new(MockEncodingClient::new().with_inprogress_count(1)),
            movies: Arc::new(MockMovieClient::new()),
        };
        McpServer::new(ToolRegistry::builtin().unwrap(), context)
    }

    async fn exchange(server: &McpServer, input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_initialize_handshake() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        );
        let responses = exchange(&server(), input).await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[1]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_tools_list_and_call() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"is_cluster_busy","arguments":{}}}"#,
            "\n",
        );
        let responses = exchange(&server(), input).await;

        assert_eq!(responses[0]["result"]["tools"].as_array().unwrap().len(), 8);
        let call = &responses[1]["result"];
        assert_eq!(call["isError"], false);
        let text = call["content"][0]["text"].as_str().unwrap();
        let body: Value = serde_json::from_str(text).unwrap();
        assert_eq!(body["status"], "busy");
    }

    #[tokio::test]
    async fn test_tool_failure_is_result_not_protocol_error() {
        let input = r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"get_latest_jobs","arguments":{"limit":11}}}"#;
        let responses = exchange(&server(), input).await;

        assert!(responses[0].get("error").is_none());
        assert_eq!(responses[0]["result"]["isError"], true);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let input = concat!(
            "this is not json\n",
            r#"{"jsonrpc":"2.0","id":1}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"resources/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"nope"}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{}}"#,
            "\n",
        );
        let responses = exchange(&server(), input).await;

        let codes: Vec<i64> = responses
            .iter()
            .map(|r| r["error"]["code"].as_i64().unwrap())
            .collect();
        assert_eq!(codes, vec![-32700, -32600, -32601, -32602, -32602]);
    }

    #[tokio::test]
    async fn test_prompts() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"prompts/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"prompts/get","params":{"name":"movie-encoding-status","arguments":{"job_name":"Heat"}}}"#,
            "\n",
        );
        let responses = exchange(&server(), input).await;

        assert_eq!(
            responses[0]["result"]["prompts"][0]["name"],
            "movie-encoding-status"
        );
        let text = responses[1]["result"]["messages"][0]["content"]["text"]
            .as_str()
            .unwrap();
        assert!(text.contains("for job: Heat"));
    }
}
