//! # Slack App
//!
//! The application-facing context: register handlers and tokens, then serve.
//!
//! ```no_run
//! use slackhook::{AppConfig, RequestContext, SlackApp};
//!
//! # async fn run() -> Result<(), slackhook::StartupError> {
//! let app = SlackApp::new(AppConfig {
//!     route_prefix: "slack".to_string(),
//!     signing_secret: "secret".to_string(),
//!     ..Default::default()
//! })?;
//!
//! app.on_command("/ping", |ctx: RequestContext| async move {
//!     format!("pong from {}", ctx.workspace_id)
//! });
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! app.serve(listener, std::future::pending()).await
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::context::{InstallHook, SlackHandler};
use crate::error::StartupError;
use crate::registry::HandlerKind;
use crate::server::{self, AppState};
use crate::tokens::WorkspaceToken;

/// One Slack app: configuration, workspace tokens, and handler tables.
///
/// Cloning is cheap and every clone shares the same registries, so handlers
/// may be registered after [`SlackApp::router`] was built.
#[derive(Clone)]
pub struct SlackApp {
    state: AppState,
}

impl SlackApp {
    /// Validates `config` and seeds the token registry from `config.tokens`.
    pub fn new(config: AppConfig) -> Result<Self, StartupError> {
        Ok(Self {
            state: AppState::new(config)?,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Handles slash command `command` (including the leading `/`).
    pub fn on_command<H: SlackHandler + 'static>(&self, command: &str, handler: H) -> &Self {
        self.register(HandlerKind::Command, command, handler)
    }

    pub fn remove_command(&self, command: &str) -> bool {
        self.state.handlers.remove_command(command)
    }

    /// Handles global and message shortcuts with `callback_id`.
    pub fn on_shortcut<H: SlackHandler + 'static>(&self, callback_id: &str, handler: H) -> &Self {
        self.register(HandlerKind::Shortcut, callback_id, handler)
    }

    /// Handles `block_actions` whose first action has `action_id`.
    pub fn on_action<H: SlackHandler + 'static>(&self, action_id: &str, handler: H) -> &Self {
        self.register(HandlerKind::Action, action_id, handler)
    }

    pub fn on_view_submission<H: SlackHandler + 'static>(
        &self,
        callback_id: &str,
        handler: H,
    ) -> &Self {
        self.register(HandlerKind::ViewSubmission, callback_id, handler)
    }

    pub fn on_view_close<H: SlackHandler + 'static>(&self, callback_id: &str, handler: H) -> &Self {
        self.register(HandlerKind::ViewClosed, callback_id, handler)
    }

    /// Runs after every successful install. Replaces any earlier hook.
    pub fn on_app_install<H: InstallHook + 'static>(&self, hook: H) -> &Self {
        self.state.set_install_hook(Arc::new(hook));
        self
    }

    pub fn set_tokens(&self, tokens: impl IntoIterator<Item = WorkspaceToken>) {
        self.state.tokens.set_tokens(tokens);
    }

    pub fn add_token(&self, token: WorkspaceToken) {
        self.state.tokens.add_token(token);
    }

    pub fn find_token(&self, workspace_id: &str) -> Option<WorkspaceToken> {
        self.state.tokens.find(workspace_id)
    }

    /// The axum router serving every Slack route under the configured prefix.
    pub fn router(&self) -> Router {
        server::create_app(self.state.clone())
    }

    /// Serves on `listener` until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        server::serve(listener, self.state.clone(), shutdown).await
    }

    /// Binds the configured address and serves until Ctrl-C.
    pub async fn run(&self) -> Result<(), StartupError> {
        server::run_server(self.state.clone()).await
    }

    fn register<H: SlackHandler + 'static>(&self, kind: HandlerKind, key: &str, handler: H) -> &Self {
        self.state.handlers.register(kind, key, Arc::new(handler));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::context::RequestContext;

    fn config() -> AppConfig {
        AppConfig {
            route_prefix: "slack".to_string(),
            signing_secret: "secret".to_string(),
            tokens: vec![WorkspaceToken::new("T1", "xoxb-1")],
            ..Default::default()
        }
    }

    #[test]
    fn test_new_rejects_misconfiguration() {
        let result = SlackApp::new(AppConfig {
            route_prefix: String::new(),
            ..config()
        });
        assert!(matches!(
            result,
            Err(StartupError::Config(ConfigError::MissingRoutePrefix))
        ));
    }

    #[test]
    fn test_configured_tokens_are_seeded() {
        let app = SlackApp::new(config()).unwrap();
        assert_eq!(app.find_token("T1").unwrap().token, "xoxb-1");
        assert!(app.find_token("T2").is_none());

        app.add_token(WorkspaceToken::new("T2", "xoxb-2"));
        assert!(app.find_token("T2").is_some());

        app.set_tokens(vec![WorkspaceToken::new("T3", "xoxb-3")]);
        assert!(app.find_token("T1").is_none());
    }

    #[test]
    fn test_on_command_is_idempotent() {
        let app = SlackApp::new(config()).unwrap();
        let handler = |_ctx: RequestContext| async { "pong" };
        app.on_command("/ping", handler).on_command("/ping", handler);

        let table = app.state().handlers.table(HandlerKind::Command);
        assert_eq!(table.keys(), vec!["/ping"]);

        assert!(app.remove_command("/ping"));
        assert!(table.is_empty());
    }

    #[test]
    fn test_clones_share_registries() {
        let app = SlackApp::new(config()).unwrap();
        let clone = app.clone();
        clone.on_shortcut("open", |_ctx: RequestContext| async { "" });

        assert!(app.state().handlers.lookup(HandlerKind::Shortcut, "open").is_some());
    }
}
