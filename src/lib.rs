//! PLM Gateway Library
//!
//! Exposes remote PLM operations ("tools") to AI-assistant clients through
//! a JSON-RPC 2.0 surface with a parallel plain-REST fallback, translating
//! each tool call into authenticated REST calls against a legacy OData
//! backend.
//!
//! # Core pieces
//!
//! - **Tool registry**: flattens domain agents into one `agent_tool`
//!   namespace and validates arguments before dispatch
//! - **Backend client**: per-profile Basic-Auth client with a CSRF token
//!   fetch/refresh lifecycle independent of business calls
//! - **Profile store**: N backend profiles, exactly one active, atomically
//!   hot-swappable at runtime
//! - **Protocol bridge**: client-side dual transport with bounded fallback
//!   from JSON-RPC to REST

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agent;
pub mod backend;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
