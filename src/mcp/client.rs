//! JSON-RPC 2.0 client for an MCP server spawned as a child process.
//!
//! Messages are newline-delimited JSON over the child's stdio. Construction
//! is all-or-nothing: the process is spawned, the `initialize` handshake
//! completes, and the `notifications/initialized` notification is sent before
//! a client is handed out.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{SessionError, SessionResult};

const PROTOCOL_VERSION: &str = "2024-11-05";
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// One named, schema-described operation the server exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: Option<u64>,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

struct StdioTransport {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Live connection to one MCP server process.
pub struct McpClient {
    transport: Mutex<Option<StdioTransport>>,
    request_id: AtomicU64,
}

impl McpClient {
    /// Spawn the server process and perform the initialization handshake.
    pub async fn connect(command: &str, args: &[String]) -> SessionResult<Self> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SessionError::InitFailed(format!("failed to spawn MCP server '{command}': {e}"))
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            SessionError::InitFailed("failed to capture MCP server stdin".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            SessionError::InitFailed("failed to capture MCP server stdout".to_string())
        })?;

        let mut transport = StdioTransport {
            process: child,
            stdin,
            stdout: BufReader::new(stdout),
        };

        let request_id = AtomicU64::new(1);
        Self::handshake(&mut transport, &request_id).await?;

        Ok(Self {
            transport: Mutex::new(Some(transport)),
            request_id,
        })
    }

    async fn handshake(transport: &mut StdioTransport, request_id: &AtomicU64) -> SessionResult<()> {
        let id = request_id.fetch_add(1, Ordering::SeqCst);
        let init = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method: "initialize".to_string(),
            params: Some(serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": "querybridge",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            })),
        };

        write_message(&mut transport.stdin, &init).await?;
        let response = read_response(&mut transport.stdout).await?;
        let result = expect_result(response, "initialize")
            .map_err(|e| SessionError::InitFailed(e.to_string()))?;
        debug!(
            protocol = result.get("protocolVersion").and_then(serde_json::Value::as_str),
            "MCP server initialized"
        );

        // Notification: no id, no response expected.
        let initialized = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized",
            "params": {},
        });
        write_message(&mut transport.stdin, &initialized).await?;

        Ok(())
    }

    /// Retrieve the set of callable tools the server exposes.
    pub async fn list_tools(&self) -> SessionResult<Vec<ToolDescriptor>> {
        let response = self.request("tools/list", None).await?;
        let result = expect_result(response, "tools/list")?;
        Ok(parse_tool_catalog(&result))
    }

    /// Invoke one tool and return the text content of its result.
    pub async fn call_tool(&self, name: &str, args: Value) -> SessionResult<String> {
        let params = serde_json::json!({ "name": name, "arguments": args });
        let response = self.request("tools/call", Some(params)).await?;

        if let Some(error) = response.error {
            return Err(SessionError::ToolCall {
                name: name.to_string(),
                cause: format!("[{}] {}", error.code, error.message),
            });
        }

        Ok(extract_text_content(&response.result.unwrap_or(Value::Null)))
    }

    /// Close the transport and reap the child. Safe to call more than once.
    pub async fn close(&self) {
        let mut guard = self.transport.lock().await;
        if let Some(mut transport) = guard.take() {
            // Dropping stdin signals EOF; kill covers servers that ignore it.
            drop(transport.stdin);
            if let Err(e) = transport.process.kill().await {
                warn!(error = %e, "failed to kill MCP server process");
            }
            let _ = transport.process.wait().await;
        }
    }

    async fn request(&self, method: &str, params: Option<Value>) -> SessionResult<JsonRpcResponse> {
        let mut guard = self.transport.lock().await;
        let transport = guard
            .as_mut()
            .ok_or_else(|| SessionError::Transport("connection is closed".to_string()))?;

        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.request_id.fetch_add(1, Ordering::SeqCst),
            method: method.to_string(),
            params,
        };

        write_message(&mut transport.stdin, &request).await?;
        read_response(&mut transport.stdout).await
    }
}

async fn write_message<T: Serialize>(stdin: &mut ChildStdin, message: &T) -> SessionResult<()> {
    let mut line = serde_json::to_string(message)
        .map_err(|e| SessionError::Transport(format!("serializing request: {e}")))?;
    line.push('\n');
    stdin
        .write_all(line.as_bytes())
        .await
        .map_err(|e| SessionError::Transport(format!("writing to MCP server stdin: {e}")))?;
    stdin
        .flush()
        .await
        .map_err(|e| SessionError::Transport(format!("flushing MCP server stdin: {e}")))?;
    Ok(())
}

async fn read_response(stdout: &mut BufReader<ChildStdout>) -> SessionResult<JsonRpcResponse> {
    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = tokio::time::timeout(RESPONSE_TIMEOUT, stdout.read_line(&mut line))
            .await
            .map_err(|_| {
                SessionError::Transport("timeout waiting for MCP server response".to_string())
            })?
            .map_err(|e| SessionError::Transport(format!("reading MCP server stdout: {e}")))?;

        if bytes_read == 0 {
            return Err(SessionError::Transport(
                "MCP server closed stdout".to_string(),
            ));
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // Servers may interleave log lines with protocol messages.
        match serde_json::from_str::<JsonRpcResponse>(trimmed) {
            Ok(response) => return Ok(response),
            Err(_) => continue,
        }
    }
}

fn expect_result(response: JsonRpcResponse, method: &str) -> SessionResult<Value> {
    response.result.ok_or_else(|| {
        let cause = response
            .error
            .map(|e| format!("[{}] {}", e.code, e.message))
            .unwrap_or_else(|| "no result in response".to_string());
        SessionError::Transport(format!("{method} failed: {cause}"))
    })
}

/// Parse a `tools/list` result into the tool catalog.
pub(crate) fn parse_tool_catalog(result: &Value) -> Vec<ToolDescriptor> {
    result
        .get("tools")
        .and_then(Value::as_array)
        .map(|tools| {
            tools
                .iter()
                .map(|tool| ToolDescriptor {
                    name: tool
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    description: tool
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    input_schema: tool
                        .get("inputSchema")
                        .cloned()
                        .unwrap_or_else(|| serde_json::json!({"type": "object"})),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Extract the concatenated text parts of an MCP tool result
/// (`{ content: [{ type: "text", text: "..." }] }`).
pub(crate) fn extract_text_content(result: &Value) -> String {
    match result.get("content").and_then(Value::as_array) {
        Some(content) => {
            let parts: Vec<&str> = content
                .iter()
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect();
            if parts.is_empty() {
                result.to_string()
            } else {
                parts.join("\n")
            }
        }
        None => result.to_string(),
    }
}
