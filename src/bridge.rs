//! Dual-transport client bridge
//!
//! Gives callers one behavior regardless of whether the gateway endpoint
//! speaks JSON-RPC or plain REST, and regardless of which one currently
//! works. The JSON-RPC transport is primary; a transport-level failure
//! (timeout, connect error, non-2xx, malformed JSON) triggers exactly one
//! retry over the REST fallback. An explicit JSON-RPC `error` member is
//! authoritative and never falls back.

use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::rpc_codes;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse, ToolInfo, ToolsListResult};
use crate::{Error, Result};

/// Deadline for one tool execution across either transport
pub const TOOL_CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Deadline for a tool listing across either transport
pub const LIST_TIMEOUT: Duration = Duration::from_secs(5);

/// Tool listing plus the connection status of the surface that served it
///
/// A listing failure degrades to an empty list with `connected == false`
/// rather than an error, so callers can render a visible
/// connection-status indicator instead of crashing.
#[derive(Debug, Clone)]
pub struct ToolListing {
    /// Tools reported by the gateway (empty when disconnected)
    pub tools: Vec<ToolInfo>,
    /// Whether either transport answered
    pub connected: bool,
}

/// Client bridge over the gateway's JSON-RPC and REST surfaces
pub struct ProtocolBridge {
    http: Client,
    base_url: String,
    tool_timeout: Duration,
    list_timeout: Duration,
}

impl ProtocolBridge {
    /// Create a bridge for the gateway at `base_url`
    ///
    /// # Errors
    ///
    /// `Error::Config` when the HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .tcp_nodelay(true)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tool_timeout: TOOL_CALL_TIMEOUT,
            list_timeout: LIST_TIMEOUT,
        })
    }

    /// Override the fixed transport deadlines
    #[must_use]
    pub fn with_timeouts(mut self, tool_timeout: Duration, list_timeout: Duration) -> Self {
        self.tool_timeout = tool_timeout;
        self.list_timeout = list_timeout;
        self
    }

    /// Execute a tool, preferring JSON-RPC and falling back to REST
    ///
    /// JSON-RPC results wrapped in a content envelope are unwrapped to the
    /// business value; REST fallback results are returned as-is.
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<Value> {
        match self.call_primary(name, &args).await {
            Ok(value) => Ok(value),
            Err(Error::Transport(reason)) => {
                warn!(tool = %name, reason = %reason, "Primary transport failed, retrying via REST");
                self.call_fallback(name, &args).await
            }
            Err(other) => Err(other),
        }
    }

    /// List tools, preferring JSON-RPC and falling back to REST
    ///
    /// No content unwrap: the registry always returns a flat array.
    pub async fn list_tools(&self) -> Result<Vec<ToolInfo>> {
        match self.list_primary().await {
            Ok(tools) => Ok(tools),
            Err(Error::Transport(reason)) => {
                warn!(reason = %reason, "Primary transport failed for listing, retrying via REST");
                self.list_fallback().await
            }
            Err(other) => Err(other),
        }
    }

    /// List tools, degrading to an empty list on total failure
    pub async fn list_tools_status(&self) -> ToolListing {
        match self.list_tools().await {
            Ok(tools) => ToolListing {
                tools,
                connected: true,
            },
            Err(e) => {
                warn!(error = %e, "Tool listing unavailable on both transports");
                ToolListing {
                    tools: Vec::new(),
                    connected: false,
                }
            }
        }
    }

    /// JSON-RPC `tools/call` against `POST /mcp`
    async fn call_primary(&self, name: &str, args: &Value) -> Result<Value> {
        let request = JsonRpcRequest::new(
            uuid::Uuid::new_v4().to_string(),
            "tools/call",
            Some(json!({ "name": name, "arguments": args })),
        );

        let response = self
            .post_rpc(&request, self.tool_timeout)
            .await
            .map(Self::unwrap_rpc_outcome)??;
        Ok(unwrap_content(response))
    }

    /// JSON-RPC `tools/list` against `POST /mcp`
    async fn list_primary(&self) -> Result<Vec<ToolInfo>> {
        let request =
            JsonRpcRequest::new(uuid::Uuid::new_v4().to_string(), "tools/list", None);

        let result = self
            .post_rpc(&request, self.list_timeout)
            .await
            .map(Self::unwrap_rpc_outcome)??;
        let listing: ToolsListResult = serde_json::from_value(result)
            .map_err(|e| Error::Transport(format!("Malformed tools/list result: {e}")))?;
        Ok(listing.tools)
    }

    /// POST a JSON-RPC envelope, racing the transport against `deadline`
    async fn post_rpc(
        &self,
        request: &JsonRpcRequest,
        deadline: Duration,
    ) -> Result<JsonRpcResponse> {
        let url = format!("{}/mcp", self.base_url);
        debug!(method = %request.method, url = %url, "JSON-RPC request");

        let send = self.http.post(&url).json(request).send();
        let response = tokio::time::timeout(deadline, send)
            .await
            .map_err(|_| Error::Transport(format!("{} timed out after {deadline:?}", request.method)))?
            .map_err(|e| Error::Transport(format!("JSON-RPC POST failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "Primary transport returned HTTP {status}"
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("Failed to read response: {e}")))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Transport(format!("Malformed JSON-RPC response: {e}")))
    }

    /// Split a JSON-RPC response into result or authoritative error
    ///
    /// A `method not found` code identifies an unknown tool; every other
    /// explicit error surfaces as a protocol error with no fallback.
    fn unwrap_rpc_outcome(response: JsonRpcResponse) -> Result<Value> {
        if let Some(error) = response.error {
            if error.code == rpc_codes::METHOD_NOT_FOUND {
                return Err(Error::ToolNotFound(error.message));
            }
            return Err(Error::Protocol {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// REST fallback: `POST /tools/{name}` with the raw arguments as body
    async fn call_fallback(&self, name: &str, args: &Value) -> Result<Value> {
        let url = format!("{}/tools/{name}", self.base_url);
        debug!(tool = %name, url = %url, "REST fallback request");

        let send = self.http.post(&url).json(args).send();
        let response = tokio::time::timeout(self.tool_timeout, send)
            .await
            .map_err(|_| Error::Transport(format!("REST fallback timed out for {name}")))?
            .map_err(|e| Error::Transport(format!("REST fallback failed: {e}")))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.is_success() {
            // Returned as-is: no content unwrap on the fallback path.
            return Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)));
        }

        let message = fallback_message(&text);
        match status.as_u16() {
            404 => Err(Error::ToolNotFound(name.to_string())),
            500 => Err(Error::BackendApi {
                status: 500,
                message,
                body: (!text.is_empty()).then_some(text),
            }),
            code => Err(Error::ExecutionFailed(format!(
                "REST fallback returned HTTP {code}: {message}"
            ))),
        }
    }

    /// REST fallback: `GET /tools`
    async fn list_fallback(&self) -> Result<Vec<ToolInfo>> {
        let url = format!("{}/tools", self.base_url);

        let send = self.http.get(&url).send();
        let response = tokio::time::timeout(self.list_timeout, send)
            .await
            .map_err(|_| Error::Transport("REST fallback listing timed out".to_string()))?
            .map_err(|e| Error::Transport(format!("REST fallback listing failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ExecutionFailed(format!(
                "REST fallback listing returned HTTP {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("Malformed listing response: {e}")))
    }
}

/// Unwrap an MCP content envelope to the business value
///
/// When `result.content` is a non-empty array whose first element is a text
/// item, the parsed `text` is the value (falling back to the raw string
/// when it is not JSON). Anything else passes through untouched - the
/// unwrap is a transport-compatibility shim, never a semantic transform.
fn unwrap_content(result: Value) -> Value {
    let Some(first) = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
    else {
        return result;
    };
    if first.get("type").and_then(Value::as_str) != Some("text") {
        return result;
    }
    let Some(text) = first.get("text").and_then(Value::as_str) else {
        return result;
    };
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Pull the server message out of a fallback error body
fn fallback_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v["error"]
                .as_str()
                .map(ToString::to_string)
                .or_else(|| v["error"]["message"].as_str().map(ToString::to_string))
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                "no response body".to_string()
            } else {
                body.chars().take(200).collect()
            }
        })
}
