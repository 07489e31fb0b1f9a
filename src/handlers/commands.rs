//! Slash command callbacks.

use axum::{
    extract::{Request, State},
    response::Response,
};

use crate::error::DispatchError;
use crate::event::parse_form;
use crate::handlers::{authenticate, invoke, reject, resolve_workspace};
use crate::registry::HandlerKind;
use crate::server::AppState;

/// `POST /{prefix}/commands`
pub async fn commands(State(state): State<AppState>, request: Request) -> Response {
    match dispatch(&state, request).await {
        Ok(response) => response,
        Err(error) => reject(error, HandlerKind::Command.as_str()),
    }
}

async fn dispatch(state: &AppState, request: Request) -> Result<Response, DispatchError> {
    let (parts, body) = authenticate(state, request).await?;

    let form = parse_form(&body).ok_or(DispatchError::InvalidForm)?;
    let team_id = form.get("team_id").map(String::as_str).unwrap_or_default();
    let workspace = resolve_workspace(state, team_id)?;

    let command = form.get("command").map(String::as_str).unwrap_or_default();
    let handler = state
        .handlers
        .lookup(HandlerKind::Command, command)
        .ok_or_else(|| DispatchError::UnknownCommand {
            command: command.to_string(),
        })?;

    Ok(invoke(handler, HandlerKind::Command, parts, body, workspace).await)
}
