//! # Error Handling
//!
//! Rejections produced while dispatching Slack callbacks, and the errors that
//! stop the app from starting. Rejection bodies are short plain-text
//! diagnostics; Slack shows nothing of them to users.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ConfigError;
use crate::webhook_verification::VerificationError;

/// Why a command or interaction request was not handed to a handler.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unauthorized")]
    Unauthorized(#[source] VerificationError),

    #[error("Invalid Body")]
    InvalidBody,

    #[error("Invalid Form Body")]
    InvalidForm,

    #[error("Invalid JSON format")]
    InvalidJson(#[source] Option<serde_json::Error>),

    #[error("App not installed for workspace")]
    NotInstalled { workspace_id: String },

    #[error("Unrecognized shortcut callback_id")]
    UnknownShortcut { callback_id: String },

    #[error("Unrecognized action action_id")]
    UnknownAction { action_id: String },

    #[error("Missing action in block_actions payload")]
    MissingAction,

    #[error("Unrecognized view submission callback_id")]
    UnknownViewSubmission { callback_id: String },

    #[error("Unrecognized view closed callback_id")]
    UnknownViewClosed { callback_id: String },

    #[error("Unrecognized interaction type")]
    UnknownInteraction,

    #[error("Unrecognized command")]
    UnknownCommand { command: String },
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Label used for the `outcome` metric dimension.
    pub fn outcome(&self) -> &'static str {
        match self {
            DispatchError::Unauthorized(_) => "unauthorized",
            DispatchError::InvalidBody
            | DispatchError::InvalidForm
            | DispatchError::InvalidJson(_)
            | DispatchError::MissingAction => "malformed",
            DispatchError::NotInstalled { .. } => "not_installed",
            DispatchError::UnknownShortcut { .. }
            | DispatchError::UnknownAction { .. }
            | DispatchError::UnknownViewSubmission { .. }
            | DispatchError::UnknownViewClosed { .. }
            | DispatchError::UnknownInteraction
            | DispatchError::UnknownCommand { .. } => "unrecognized",
        }
    }

    fn log(&self) {
        match self {
            DispatchError::Unauthorized(err) => {
                warn!(reason = %err, "Rejected Slack request with invalid signature");
            }
            DispatchError::InvalidJson(Some(err)) => {
                debug!(error = %err, "Interaction payload is not valid JSON");
            }
            DispatchError::NotInstalled { workspace_id } => {
                warn!(workspace_id = %workspace_id, "App not installed for workspace");
            }
            DispatchError::UnknownShortcut { callback_id } => {
                warn!(callback_id = %callback_id, "No handler for shortcut");
            }
            DispatchError::UnknownAction { action_id } => {
                warn!(action_id = %action_id, "No handler for block action");
            }
            DispatchError::UnknownViewSubmission { callback_id } => {
                warn!(callback_id = %callback_id, "No handler for view submission");
            }
            DispatchError::UnknownViewClosed { callback_id } => {
                warn!(callback_id = %callback_id, "No handler for view closed");
            }
            DispatchError::UnknownCommand { command } => {
                warn!(command = %command, "No handler for slash command");
            }
            DispatchError::UnknownInteraction => warn!("Unrecognized interaction type"),
            DispatchError::MissingAction => warn!("block_actions payload carried no actions"),
            _ => debug!(reason = %self, "Rejected malformed Slack request"),
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        self.log();
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Errors that prevent the app from being built.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build Slack HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("failed to serve: {0}")]
    Io(#[from] std::io::Error),
}
