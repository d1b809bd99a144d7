//! HTTP router and handlers
//!
//! One port serves both client transports: JSON-RPC over `POST /mcp` and
//! the plain REST fallback (`GET /tools`, `POST /tools/{name}`), plus the
//! server-management and health surfaces.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    trace::TraceLayer,
};
use tracing::debug;

use crate::backend::ServerProfileStore;
use crate::error::rpc_codes;
use crate::protocol::{JsonRpcResponse, RequestId, ToolsCallResult, ToolsListResult};
use crate::Error;
use crate::registry::ToolRegistry;

/// Shared application state
pub struct AppState {
    /// Tool registry
    pub registry: Arc<ToolRegistry>,
    /// Server profile store
    pub store: Arc<ServerProfileStore>,
    /// Process start time, reported by the health surface
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(info_handler))
        .route("/info", get(info_handler))
        .route("/health", get(health_handler))
        .route("/mcp", post(rpc_handler))
        .route("/tools", get(tools_list_handler))
        .route("/tools/{name}", post(tools_call_handler))
        .route("/servers", get(servers_handler))
        .route("/servers/current", get(servers_current_handler))
        .route("/servers/switch", post(servers_switch_handler))
        .layer(CatchPanicLayer::new())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// JSON-RPC surface
// ============================================================================

/// POST /mcp - JSON-RPC endpoint
async fn rpc_handler(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> axum::response::Response {
    let request: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                None,
                rpc_codes::PARSE_ERROR,
                format!("Invalid JSON: {e}"),
            ))
            .into_response();
        }
    };

    let (id, method, params) = match parse_request(&request) {
        Ok(parsed) => parsed,
        Err(response) => return Json(response).into_response(),
    };

    debug!(method = %method, "JSON-RPC request");

    // Notifications carry no id and expect no response payload.
    let Some(id) = id else {
        return (StatusCode::ACCEPTED, Json(json!({}))).into_response();
    };

    let response = match method.as_str() {
        "initialize" => handle_initialize(id),
        "tools/list" => handle_tools_list(&state, id),
        "tools/call" => handle_tools_call(&state, id, params.as_ref()).await,
        other => JsonRpcResponse::error(
            Some(id),
            rpc_codes::METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        ),
    };

    Json(response).into_response()
}

/// Split a raw JSON-RPC request into `(id, method, params)`
///
/// `id` is `None` for notifications. Requests without a method are invalid.
fn parse_request(
    request: &Value,
) -> std::result::Result<(Option<RequestId>, String, Option<Value>), JsonRpcResponse> {
    let Some(method) = request.get("method").and_then(Value::as_str) else {
        return Err(JsonRpcResponse::error(
            None,
            rpc_codes::INVALID_REQUEST,
            "Missing method",
        ));
    };

    let id = request
        .get("id")
        .cloned()
        .and_then(|v| serde_json::from_value::<RequestId>(v).ok());

    if id.is_none() && !method.starts_with("notifications/") {
        return Err(JsonRpcResponse::error(
            None,
            rpc_codes::INVALID_REQUEST,
            "Missing id",
        ));
    }

    Ok((id, method.to_string(), request.get("params").cloned()))
}

fn handle_initialize(id: RequestId) -> JsonRpcResponse {
    JsonRpcResponse::success(
        id,
        json!({
            "protocolVersion": "2024-11-05",
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": { "tools": {} }
        }),
    )
}

fn handle_tools_list(state: &AppState, id: RequestId) -> JsonRpcResponse {
    let result = ToolsListResult {
        tools: state.registry.list(),
    };
    match serde_json::to_value(result) {
        Ok(v) => JsonRpcResponse::success(id, v),
        Err(e) => JsonRpcResponse::error(Some(id), rpc_codes::INTERNAL_ERROR, e.to_string()),
    }
}

async fn handle_tools_call(
    state: &AppState,
    id: RequestId,
    params: Option<&Value>,
) -> JsonRpcResponse {
    let Some(params) = params else {
        return JsonRpcResponse::error(Some(id), rpc_codes::INVALID_PARAMS, "Missing params");
    };
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return JsonRpcResponse::error(
            Some(id),
            rpc_codes::INVALID_PARAMS,
            "Missing tool name",
        );
    };
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

    match state.registry.invoke(name, arguments).await {
        Ok(value) => {
            let result = ToolsCallResult::from_value(&value);
            JsonRpcResponse::success(id, serde_json::to_value(result).unwrap_or(Value::Null))
        }
        // Registry-level failures are protocol errors the caller must fix.
        Err(err @ (Error::ToolNotFound(_) | Error::Validation { .. })) => {
            JsonRpcResponse::error(Some(id), err.to_rpc_code(), err.to_string())
        }
        // Execution failures stay inside the result envelope so they never
        // escape the dispatch boundary as thrown errors.
        Err(err) => {
            let result = ToolsCallResult::from_error(&err.to_string());
            JsonRpcResponse::success(id, serde_json::to_value(result).unwrap_or(Value::Null))
        }
    }
}

// ============================================================================
// REST fallback surface
// ============================================================================

/// GET /tools - flat schema-only array
async fn tools_list_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.registry.list())
}

/// POST /tools/{name} - execute with the raw body as arguments
async fn tools_call_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    let args: Value = if body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("Invalid JSON body: {e}") })),
                );
            }
        }
    };

    match state.registry.invoke(&name, args).await {
        Ok(value) => (StatusCode::OK, Json(value)),
        Err(err) => {
            let status = match &err {
                Error::ToolNotFound(_) => StatusCode::NOT_FOUND,
                Error::Validation { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(json!({ "error": err.to_string() })))
        }
    }
}

// ============================================================================
// Server management surface
// ============================================================================

/// Body of POST /servers/switch
#[derive(Debug, Deserialize)]
struct SwitchRequest {
    /// Profile id to activate
    #[serde(rename = "serverId")]
    server_id: u32,
}

/// GET /servers
async fn servers_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.summaries())
}

/// GET /servers/current
async fn servers_current_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.active_profile().summary(true))
}

/// POST /servers/switch
async fn servers_switch_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SwitchRequest>,
) -> impl IntoResponse {
    match state.store.switch(request.server_id) {
        Ok(profile) => (StatusCode::OK, Json(json!(profile.summary(true)))),
        Err(err) => {
            let status = match &err {
                Error::UnknownServer(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(json!({ "error": err.to_string() })))
        }
    }
}

// ============================================================================
// Health / info surface
// ============================================================================

/// GET /health
///
/// Degrades to 503 when the active backend fails a cheap reachability
/// probe; the gateway itself keeps serving either way.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let client = state.store.active();
    let backend_reachable = client.ping().await.is_ok();
    let uptime = (chrono::Utc::now() - state.started_at).num_seconds();

    let response = json!({
        "status": if backend_reachable { "healthy" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "activeServer": client.profile().name,
        "backendReachable": backend_reachable,
        "uptimeSeconds": uptime,
        "tools": state.registry.len(),
    });

    if backend_reachable {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// GET / and GET /info
async fn info_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "tools": state.registry.len(),
        "activeServer": state.store.active_profile().summary(true),
        "endpoints": {
            "jsonrpc": "POST /mcp",
            "tools": "GET /tools, POST /tools/{name}",
            "servers": "GET /servers, GET /servers/current, POST /servers/switch",
            "health": "GET /health",
        }
    }))
}
