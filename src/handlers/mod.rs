//! # Slack Handlers
//!
//! HTTP entry points: liveness, install redirect, slash commands, and
//! interaction callbacks, plus the authentication steps they share.

use axum::{
    body::{Bytes, to_bytes},
    extract::Request,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::context::RequestContext;
use crate::error::DispatchError;
use crate::registry::{HandlerKind, SharedHandler};
use crate::server::AppState;
use crate::telemetry;
use crate::tokens::WorkspaceToken;
use crate::webhook_verification::{signature_headers, verify_request};

pub mod commands;
pub mod install;
pub mod interactions;

/// Liveness check; always 200 with an empty body.
pub async fn root() {}

/// Buffers the body and checks the Slack signature headers against it.
///
/// Requests without signature headers are refused before the body is read.
pub(crate) async fn authenticate(
    state: &AppState,
    request: Request,
) -> Result<(Parts, Bytes), DispatchError> {
    signature_headers(request.headers()).map_err(DispatchError::Unauthorized)?;

    let (parts, body) = request.into_parts();
    let body = to_bytes(body, state.config.max_body_bytes)
        .await
        .map_err(|_| DispatchError::InvalidBody)?;

    verify_request(
        &parts.headers,
        &body,
        &state.config.signing_secret,
        state.config.signature_tolerance_seconds,
    )
    .map_err(DispatchError::Unauthorized)?;

    Ok((parts, body))
}

pub(crate) fn resolve_workspace(
    state: &AppState,
    workspace_id: &str,
) -> Result<WorkspaceToken, DispatchError> {
    state
        .tokens
        .find(workspace_id)
        .ok_or_else(|| DispatchError::NotInstalled {
            workspace_id: workspace_id.to_string(),
        })
}

/// Runs `handler` on the request task and returns its response unchanged.
pub(crate) async fn invoke(
    handler: SharedHandler,
    kind: HandlerKind,
    parts: Parts,
    body: Bytes,
    workspace: WorkspaceToken,
) -> Response {
    debug!(kind = %kind, workspace_id = %workspace.workspace_id, "Dispatching to handler");
    let ctx = RequestContext {
        body,
        token: workspace.token,
        workspace_id: workspace.workspace_id,
        parts,
    };
    let response = handler.handle(ctx).await;
    telemetry::record_dispatch(kind.as_str(), "handled");
    response
}

/// Counts and renders a rejection. `endpoint` labels errors raised before routing.
pub(crate) fn reject(error: DispatchError, endpoint: &'static str) -> Response {
    let kind = match &error {
        DispatchError::UnknownShortcut { .. } => HandlerKind::Shortcut.as_str(),
        DispatchError::UnknownAction { .. } | DispatchError::MissingAction => {
            HandlerKind::Action.as_str()
        }
        DispatchError::UnknownViewSubmission { .. } => HandlerKind::ViewSubmission.as_str(),
        DispatchError::UnknownViewClosed { .. } => HandlerKind::ViewClosed.as_str(),
        DispatchError::UnknownCommand { .. } => HandlerKind::Command.as_str(),
        _ => endpoint,
    };
    telemetry::record_dispatch(kind, error.outcome());
    error.into_response()
}
