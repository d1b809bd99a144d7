//! Gateway server wiring and lifecycle

mod router;

pub use router::{AppState, create_router};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::agent::Agent;
use crate::backend::{ServerProfile, ServerProfileStore};
use crate::config::Config;
use crate::registry::ToolRegistry;
use crate::{Error, Result};

/// PLM gateway server
pub struct Gateway {
    config: Config,
    registry: Arc<ToolRegistry>,
    store: Arc<ServerProfileStore>,
}

impl Gateway {
    /// Create a gateway from configuration and the domain agents to expose
    ///
    /// # Errors
    ///
    /// Returns an error on invalid profile configuration or duplicate tool
    /// registration - both are startup-time fatal.
    pub fn new(config: Config, agents: Vec<Agent>) -> Result<Self> {
        let profiles: Vec<ServerProfile> = config
            .backend
            .profiles
            .iter()
            .map(crate::config::ProfileConfig::to_profile)
            .collect();
        let store = Arc::new(ServerProfileStore::new(
            profiles,
            config.backend.active_server,
        )?);

        let registry = Arc::new(ToolRegistry::new());
        registry.register(&crate::diagnostics::agent(Arc::clone(&store)))?;
        for agent in &agents {
            registry.register(agent)?;
        }

        Ok(Self {
            config,
            registry,
            store,
        })
    }

    /// Registered tool registry (for embedding and tests)
    #[must_use]
    pub fn registry(&self) -> Arc<ToolRegistry> {
        Arc::clone(&self.registry)
    }

    /// Profile store (for embedding and tests)
    #[must_use]
    pub fn store(&self) -> Arc<ServerProfileStore> {
        Arc::clone(&self.store)
    }

    /// Build the axum router over this gateway's state
    #[must_use]
    pub fn router(&self) -> axum::Router {
        create_router(Arc::new(AppState {
            registry: Arc::clone(&self.registry),
            store: Arc::clone(&self.store),
            started_at: chrono::Utc::now(),
        }))
    }

    /// Run the gateway until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let app = self.router();
        let listener = TcpListener::bind(addr).await?;

        info!("============================================================");
        info!("PLM GATEWAY v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, port = self.config.server.port, "Listening");
        info!(tools = self.registry.len(), "Tools registered");
        info!(
            profiles = self.store.profiles().len(),
            active = %self.store.active_profile().name,
            "Server profiles loaded"
        );
        info!("  POST /mcp            (JSON-RPC)");
        info!("  GET  /tools          (REST listing)");
        info!("  POST /tools/{{name}}   (REST execution)");
        info!("  POST /servers/switch (profile switch)");
        info!("============================================================");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        info!("Gateway shutdown complete");
        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
