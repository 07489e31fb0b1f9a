//! # slackhook
//!
//! Webhook endpoint for a multi-workspace Slack app: verifies signed slash
//! command and interaction callbacks, resolves the calling workspace's bot
//! token, and dispatches to registered handlers. Also serves the OAuth2
//! install redirect that onboards new workspaces.

pub mod app;
pub mod blocks;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod handlers;
pub mod install;
pub mod registry;
pub mod server;
pub mod telemetry;
pub mod tokens;
pub mod webhook_verification;

pub use app::SlackApp;
pub use config::{AppConfig, ConfigLoader};
pub use context::{InstallContext, InstallHook, RequestContext, SlackHandler, respond};
pub use error::{DispatchError, StartupError};
pub use tokens::WorkspaceToken;
