//! Interaction callbacks: shortcuts, block actions, and view lifecycle events.

use axum::{
    extract::{Request, State},
    response::Response,
};

use crate::error::DispatchError;
use crate::event::{InteractionEvent, InteractionKind, parse_form};
use crate::handlers::{authenticate, invoke, reject, resolve_workspace};
use crate::registry::HandlerKind;
use crate::server::AppState;

/// `POST /{prefix}/`
pub async fn interactions(State(state): State<AppState>, request: Request) -> Response {
    match dispatch(&state, request).await {
        Ok(response) => response,
        Err(error) => reject(error, "interaction"),
    }
}

async fn dispatch(state: &AppState, request: Request) -> Result<Response, DispatchError> {
    let (parts, body) = authenticate(state, request).await?;

    let form = parse_form(&body).ok_or(DispatchError::InvalidForm)?;
    let payload = form
        .get("payload")
        .ok_or(DispatchError::InvalidJson(None))?;
    let event: InteractionEvent =
        serde_json::from_str(payload).map_err(|e| DispatchError::InvalidJson(Some(e)))?;

    let workspace = resolve_workspace(state, event.team_id())?;

    let (kind, key) = route(&event)?;
    let handler = state
        .handlers
        .lookup(kind, key)
        .ok_or_else(|| unrecognized(kind, key))?;

    Ok(invoke(handler, kind, parts, body, workspace).await)
}

/// Picks the table and key an interaction is routed by.
fn route(event: &InteractionEvent) -> Result<(HandlerKind, &str), DispatchError> {
    match event.kind {
        InteractionKind::Shortcut => Ok((HandlerKind::Shortcut, event.callback_id.as_str())),
        InteractionKind::BlockActions => event
            .first_action_id()
            .map(|action_id| (HandlerKind::Action, action_id))
            .ok_or(DispatchError::MissingAction),
        InteractionKind::ViewSubmission => {
            Ok((HandlerKind::ViewSubmission, event.view_callback_id()))
        }
        InteractionKind::ViewClosed => Ok((HandlerKind::ViewClosed, event.view_callback_id())),
        InteractionKind::Unrecognized => Err(DispatchError::UnknownInteraction),
    }
}

fn unrecognized(kind: HandlerKind, key: &str) -> DispatchError {
    let key = key.to_string();
    match kind {
        HandlerKind::Shortcut => DispatchError::UnknownShortcut { callback_id: key },
        HandlerKind::Action => DispatchError::UnknownAction { action_id: key },
        HandlerKind::ViewSubmission => DispatchError::UnknownViewSubmission { callback_id: key },
        HandlerKind::ViewClosed => DispatchError::UnknownViewClosed { callback_id: key },
        HandlerKind::Command => DispatchError::UnknownCommand { command: key },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: serde_json::Value) -> InteractionEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_route_keys_per_category() {
        let shortcut = event(json!({ "type": "shortcut", "callback_id": "open_modal" }));
        assert_eq!(
            route(&shortcut).unwrap(),
            (HandlerKind::Shortcut, "open_modal")
        );

        let actions = event(json!({
            "type": "block_actions",
            "actions": [{ "action_id": "first" }, { "action_id": "second" }]
        }));
        assert_eq!(route(&actions).unwrap(), (HandlerKind::Action, "first"));

        let submission = event(json!({ "type": "view_submission", "view": { "callback_id": "form" } }));
        assert_eq!(
            route(&submission).unwrap(),
            (HandlerKind::ViewSubmission, "form")
        );

        let closed = event(json!({ "type": "view_closed", "view": { "callback_id": "form" } }));
        assert_eq!(route(&closed).unwrap(), (HandlerKind::ViewClosed, "form"));
    }

    #[test]
    fn test_route_rejections() {
        let no_actions = event(json!({ "type": "block_actions", "actions": [] }));
        assert!(matches!(route(&no_actions), Err(DispatchError::MissingAction)));

        let other = event(json!({ "type": "message_action", "callback_id": "x" }));
        assert!(matches!(route(&other), Err(DispatchError::UnknownInteraction)));
    }

    #[test]
    fn test_unrecognized_messages() {
        assert_eq!(
            unrecognized(HandlerKind::ViewClosed, "x").to_string(),
            "Unrecognized view closed callback_id"
        );
        assert_eq!(
            unrecognized(HandlerKind::Action, "x").to_string(),
            "Unrecognized action action_id"
        );
    }
}
