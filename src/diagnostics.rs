//! Built-in diagnostic agent
//!
//! A small agent the gateway itself registers so the dispatch path stays
//! exercisable without any domain agent wired in: `gateway_echo` round-trips
//! arguments, `gateway_backend_ping` probes the active backend.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::agent::{Agent, ToolDescriptor};
use crate::backend::ServerProfileStore;
use crate::protocol::{InputSchema, ParamType};

/// Build the diagnostic agent bound to the profile store
#[must_use]
pub fn agent(store: Arc<ServerProfileStore>) -> Agent {
    let echo = ToolDescriptor::new(
        "echo",
        "Echo the given message back, confirming the dispatch path works",
        InputSchema::object().property("message", ParamType::String, "Text to echo", true),
        |args: Value| async move {
            Ok(json!({ "echo": args.get("message").cloned().unwrap_or(Value::Null) }))
        },
    );

    let ping_store = Arc::clone(&store);
    let backend_ping = ToolDescriptor::new(
        "backend_ping",
        "Probe the active backend's service root and report reachability",
        InputSchema::object(),
        move |_args: Value| {
            let store = Arc::clone(&ping_store);
            async move {
                // Snapshot at call time: a concurrent switch does not
                // retarget this probe.
                let client = store.active();
                let profile = client.profile().clone();
                let reachable = client.ping().await.is_ok();
                Ok(json!({
                    "server": profile.name,
                    "serverId": profile.id,
                    "reachable": reachable,
                }))
            }
        },
    );

    Agent::new("gateway").tool(echo).tool(backend_ping)
}
