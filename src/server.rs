//! # Server Configuration
//!
//! Router, shared state, and the serve loop for the Slack endpoints.

use std::future::Future;
use std::sync::{Arc, RwLock};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::info;

use crate::config::AppConfig;
use crate::context::InstallHook;
use crate::error::StartupError;
use crate::handlers;
use crate::install::InstallExchange;
use crate::registry::HandlerRegistry;
use crate::telemetry;
use crate::tokens::TokenRegistry;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenRegistry>,
    pub handlers: Arc<HandlerRegistry>,
    pub installer: Arc<InstallExchange>,
    pub install_hook: Arc<RwLock<Option<Arc<dyn InstallHook>>>>,
}

impl AppState {
    /// Validates `config` and builds empty registries seeded with the configured tokens.
    pub fn new(config: AppConfig) -> Result<Self, StartupError> {
        config.validate()?;
        let installer = InstallExchange::new(&config)?;
        let tokens = TokenRegistry::with_tokens(config.tokens.iter().cloned());

        Ok(Self {
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            handlers: Arc::new(HandlerRegistry::new()),
            installer: Arc::new(installer),
            install_hook: Arc::new(RwLock::new(None)),
        })
    }

    /// The registered post-install hook, cloned out of its lock.
    pub fn install_hook(&self) -> Option<Arc<dyn InstallHook>> {
        self.install_hook
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_install_hook(&self, hook: Arc<dyn InstallHook>) {
        *self
            .install_hook
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(hook);
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let prefix = state.config.route_prefix().to_string();

    Router::new()
        .route("/", get(handlers::root))
        .route(
            &format!("/{prefix}/install"),
            get(handlers::install::install),
        )
        .route(
            &format!("/{prefix}/commands"),
            post(handlers::commands::commands),
        )
        .route(
            &format!("/{prefix}/"),
            post(handlers::interactions::interactions),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(telemetry::request_span))
                .layer(CatchPanicLayer::new()),
        )
}

/// Serves the app on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    let prefix = state.config.route_prefix().to_string();
    let app = create_app(state);

    info!(address = %addr, route_prefix = %prefix, "Slack endpoint listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Slack endpoint stopped");
    Ok(())
}

/// Starts the server with the given configuration, stopping on Ctrl-C.
pub async fn run_server(state: AppState) -> Result<(), StartupError> {
    let addr = state
        .config
        .bind_addr()
        .map_err(|source| crate::config::ConfigError::InvalidBindAddr {
            value: state.config.api_bind_addr.clone(),
            source,
        })?;

    let listener = TcpListener::bind(addr).await?;
    info!(profile = %state.config.profile, "Running in profile");

    serve(listener, state, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
