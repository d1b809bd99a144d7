//! End-to-end gateway tests
//!
//! Serve the real router on an ephemeral listener and drive it through the
//! protocol bridge and raw HTTP, with wiremock standing in for the OData
//! backend.

use std::time::Duration;

use serde_json::{Value, json};
use tokio::net::TcpListener;

use plm_gateway::agent::{Agent, ToolDescriptor};
use plm_gateway::bridge::ProtocolBridge;
use plm_gateway::config::{BackendSettings, Config, ProfileConfig, ServerConfig};
use plm_gateway::protocol::InputSchema;
use plm_gateway::server::Gateway;
use plm_gateway::Error;

fn profile(id: u32, name: &str, base_url: &str) -> ProfileConfig {
    ProfileConfig {
        id,
        name: name.to_string(),
        base_url: base_url.to_string(),
        api_path: "/odata/v2".to_string(),
        username: "gateway".to_string(),
        password: "secret".to_string(),
        timeout: Duration::from_secs(2),
    }
}

fn config(profiles: Vec<ProfileConfig>, active: u32) -> Config {
    Config {
        server: ServerConfig::default(),
        backend: BackendSettings {
            active_server: active,
            profiles,
        },
    }
}

/// Serve a gateway on an ephemeral port, returning its base URL
async fn spawn_gateway(config: Config, agents: Vec<Agent>) -> String {
    let gateway = Gateway::new(config, agents).expect("gateway must build");
    let router = gateway.router();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn spawn_default_gateway() -> String {
    let cfg = config(
        vec![
            profile(1, "Development", "http://127.0.0.1:1"),
            profile(2, "Production", "http://127.0.0.1:1"),
        ],
        1,
    );
    spawn_gateway(cfg, Vec::new()).await
}

fn bridge(base_url: &str) -> ProtocolBridge {
    ProtocolBridge::new(base_url)
        .unwrap()
        .with_timeouts(Duration::from_secs(2), Duration::from_secs(2))
}

async fn rpc(base_url: &str, body: Value) -> Value {
    let client = reqwest::Client::new();
    client
        .post(format!("{base_url}/mcp"))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

// ── Listing ───────────────────────────────────────────────────────────

#[tokio::test]
async fn listing_contains_builtin_diagnostics_exactly_once() {
    let base = spawn_default_gateway().await;

    let tools = bridge(&base).list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert!(names.contains(&"gateway_echo"), "tools: {names:?}");
    assert!(names.contains(&"gateway_backend_ping"));

    let mut deduped = names.clone();
    deduped.dedup();
    assert_eq!(names.len(), deduped.len(), "duplicate tool names in {names:?}");
}

#[tokio::test]
async fn rest_listing_is_a_flat_array() {
    let base = spawn_default_gateway().await;

    let tools: Value = reqwest::get(format!("{base}/tools"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(tools.is_array());
    assert!(tools.as_array().unwrap().iter().any(|t| t["name"] == "gateway_echo"));
    // Schemas only - handlers are never serialized.
    assert!(tools[0].get("handler").is_none());
}

// ── Execution ─────────────────────────────────────────────────────────

#[tokio::test]
async fn call_tool_round_trips_through_envelope_and_unwrap() {
    let base = spawn_default_gateway().await;

    let result = bridge(&base)
        .call_tool("gateway_echo", json!({"message": "hello"}))
        .await
        .unwrap();
    assert_eq!(result, json!({"echo": "hello"}));
}

#[tokio::test]
async fn rest_execution_returns_the_raw_result() {
    let base = spawn_default_gateway().await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base}/tools/gateway_echo"))
        .json(&json!({"message": "direct"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"echo": "direct"}));
}

#[tokio::test]
async fn unknown_tool_is_tool_not_found_on_both_transports() {
    let base = spawn_default_gateway().await;

    let err = bridge(&base)
        .call_tool("nope_missing", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ToolNotFound(_)), "got {err:?}");

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base}/tools/nope_missing"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn validation_failure_names_every_missing_field() {
    let base = spawn_default_gateway().await;

    let response = rpc(
        &base,
        json!({
            "jsonrpc": "2.0", "id": 1, "method": "tools/call",
            "params": { "name": "gateway_echo", "arguments": {} }
        }),
    )
    .await;

    assert_eq!(response["error"]["code"], -32602);
    let message = response["error"]["message"].as_str().unwrap();
    assert!(message.contains("message"), "missing field not named: {message}");
}

#[tokio::test]
async fn execution_failures_stay_inside_the_result_envelope() {
    let failing = Agent::new("flaky").tool(ToolDescriptor::new(
        "always_fails",
        "Fails with a backend error",
        InputSchema::object(),
        |_args: Value| async move {
            Err(Error::BackendApi {
                status: 502,
                message: "upstream exploded".to_string(),
                body: None,
            })
        },
    ));
    let cfg = config(vec![profile(1, "Development", "http://127.0.0.1:1")], 1);
    let base = spawn_gateway(cfg, vec![failing]).await;

    let response = rpc(
        &base,
        json!({
            "jsonrpc": "2.0", "id": 7, "method": "tools/call",
            "params": { "name": "flaky_always_fails", "arguments": {} }
        }),
    )
    .await;

    // Not a JSON-RPC error: the failure is a structured result payload.
    assert!(response.get("error").is_none(), "unexpected: {response}");
    assert_eq!(response["result"]["isError"], true);
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    let payload: Value = serde_json::from_str(text).unwrap();
    assert_eq!(payload["success"], false);
    assert!(payload["error"].as_str().unwrap().contains("upstream exploded"));
}

#[tokio::test]
async fn unknown_rpc_method_is_method_not_found() {
    let base = spawn_default_gateway().await;

    let response = rpc(
        &base,
        json!({"jsonrpc": "2.0", "id": 1, "method": "resources/list"}),
    )
    .await;
    assert_eq!(response["error"]["code"], -32601);
}

#[tokio::test]
async fn malformed_json_is_a_parse_error() {
    let base = spawn_default_gateway().await;

    let client = reqwest::Client::new();
    let response: Value = client
        .post(format!("{base}/mcp"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response["error"]["code"], -32700);
}

// ── Server management ─────────────────────────────────────────────────

#[tokio::test]
async fn switch_changes_the_active_profile() {
    let base = spawn_default_gateway().await;
    let client = reqwest::Client::new();

    let servers: Value = reqwest::get(format!("{base}/servers"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(servers.as_array().unwrap().len(), 2);

    let current: Value = reqwest::get(format!("{base}/servers/current"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["id"], 1);

    let switched = client
        .post(format!("{base}/servers/switch"))
        .json(&json!({"serverId": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(switched.status(), 200);

    let current: Value = reqwest::get(format!("{base}/servers/current"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["id"], 2);
    assert_eq!(current["name"], "Production");
}

#[tokio::test]
async fn switch_to_unknown_id_is_rejected_and_keeps_the_active_profile() {
    let base = spawn_default_gateway().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/servers/switch"))
        .json(&json!({"serverId": 99}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("99"));

    let current: Value = reqwest::get(format!("{base}/servers/current"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["id"], 1);
}

#[tokio::test]
async fn server_listing_never_leaks_credentials() {
    let base = spawn_default_gateway().await;

    let body = reqwest::get(format!("{base}/servers"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!body.contains("secret"));
    assert!(!body.contains("password"));
}

// ── Health / info ─────────────────────────────────────────────────────

#[tokio::test]
async fn health_degrades_when_the_backend_is_unreachable() {
    let base = spawn_default_gateway().await;

    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(response.status(), 503);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["backendReachable"], false);
}

#[tokio::test]
async fn health_is_green_when_the_backend_answers() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/odata/v2"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&backend)
        .await;

    let cfg = config(vec![profile(1, "Development", &backend.uri())], 1);
    let base = spawn_gateway(cfg, Vec::new()).await;

    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["activeServer"], "Development");
}

#[tokio::test]
async fn info_reports_name_version_and_endpoints() {
    let base = spawn_default_gateway().await;

    for route in ["", "/info"] {
        let body: Value = reqwest::get(format!("{base}{route}"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["name"], "plm-gateway");
        assert!(body["endpoints"]["jsonrpc"].as_str().unwrap().contains("/mcp"));
    }
}

// ── Startup invariants ────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_agent_registration_fails_at_startup() {
    let duplicate = Agent::new("gateway").tool(ToolDescriptor::new(
        "echo",
        "Shadows the builtin echo",
        InputSchema::object(),
        |args: Value| async move { Ok(args) },
    ));
    let cfg = config(vec![profile(1, "Development", "http://127.0.0.1:1")], 1);

    let err = Gateway::new(cfg, vec![duplicate]).err().expect("must fail");
    assert!(err.to_string().contains("gateway_echo"), "got: {err}");
}

#[tokio::test]
async fn gateway_requires_a_known_active_profile() {
    let cfg = config(vec![profile(1, "Development", "http://127.0.0.1:1")], 9);
    let err = Gateway::new(cfg, Vec::new()).err().expect("must fail");
    assert!(matches!(err, Error::UnknownServer(9)));
}
