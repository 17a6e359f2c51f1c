//! Gateway server: router assembly, serving and shutdown.

use std::{future::Future, sync::Arc};

use agent_gateway_core::{Agent, AgentSlot};
use agent_gateway_session::{Dispatcher, SessionRegistry};
use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{config::GatewayConfig, http};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Live streaming sessions.
    pub registry: SessionRegistry,
    /// Agent invocation.
    pub dispatcher: Dispatcher,
    /// Gateway configuration.
    pub config: Arc<GatewayConfig>,
}

/// HTTP + WebSocket front door for one shared agent.
#[derive(Clone)]
pub struct Gateway {
    state: AppState,
}

impl Gateway {
    /// Create a gateway with no agent bound.
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            state: AppState {
                registry: SessionRegistry::new(),
                dispatcher: Dispatcher::new(AgentSlot::new()),
                config: Arc::new(config),
            },
        }
    }

    /// Bind (or replace) the agent. May be called while serving.
    pub fn bind_agent(&self, agent: Arc<dyn Agent>) {
        self.state.dispatcher.agent().bind(agent);
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.state.config
    }

    /// Registry of live streaming sessions.
    #[must_use]
    pub const fn registry(&self) -> &SessionRegistry {
        &self.state.registry
    }

    /// Shared handler state.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router.
    #[must_use]
    pub fn router(&self) -> Router {
        let config = &self.state.config;

        let routes = Router::new()
            .route("/", get(http::root))
            .route("/status", get(http::status))
            .route("/chat", post(http::chat))
            .route("/clear", post(http::clear));
        let routes = with_websocket(routes, config.enable_websocket);

        let prefix = config.route_prefix();
        let routes = if prefix.is_empty() {
            routes
        } else {
            Router::new().nest(&prefix, routes)
        };

        routes
            .layer(config.cors_layer())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Close every streaming session. Returns how many were closed.
    pub async fn close_sessions(&self) -> usize {
        self.state.registry.close_all().await
    }

    /// Serve until `shutdown` resolves.
    ///
    /// On shutdown the registry stops admitting sessions and every open one
    /// is closed, then the listener stops accepting.
    ///
    /// # Errors
    /// Returns error if the server fails.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let config = &self.state.config;
        tracing::info!(
            platform = "api",
            host = %config.host,
            port = config.port,
            cors_origins = ?config.cors_origins,
            enable_websocket = config.enable_websocket,
            api_prefix = %config.api_prefix,
            "platform starting"
        );
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Server listening on http://{addr}");
        }

        let gateway = self.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                gateway.state.registry.shutdown().await;
            })
            .await?;

        tracing::info!(platform = "api", "platform stopped");
        Ok(())
    }
}

#[cfg(feature = "websocket")]
fn with_websocket(routes: Router<AppState>, enabled: bool) -> Router<AppState> {
    if enabled {
        routes.route("/ws", get(crate::websocket::ws_handler))
    } else {
        routes
    }
}

#[cfg(not(feature = "websocket"))]
fn with_websocket(routes: Router<AppState>, enabled: bool) -> Router<AppState> {
    if enabled {
        tracing::warn!("websocket support not compiled in");
    }
    routes
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.state.config)
            .field("agent", self.state.dispatcher.agent())
            .finish()
    }
}
