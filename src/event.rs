//! Inbound Slack payloads
//!
//! Interaction callbacks arrive as a form field `payload` holding JSON; slash
//! commands arrive as plain form fields. Block trees inside views are kept as
//! opaque JSON because Slack sends element types this crate never builds.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Interaction category, taken from the payload's `type` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Shortcut,
    BlockActions,
    ViewSubmission,
    ViewClosed,
    /// Any type this app does not route (message actions, options loads, ...).
    #[default]
    #[serde(other)]
    Unrecognized,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Shortcut => "shortcut",
            InteractionKind::BlockActions => "block_actions",
            InteractionKind::ViewSubmission => "view_submission",
            InteractionKind::ViewClosed => "view_closed",
            InteractionKind::Unrecognized => "unrecognized",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionUser {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub team_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionTeam {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionChannel {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// Where the interacted-with element lives (message, view, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionContainer {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message_ts: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub view_id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_ephemeral: bool,
}

/// One element of a `block_actions` payload's `actions` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionAction {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub block_id: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action_ts: String,
}

/// Submitted input values, keyed by block id then action id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub values: HashMap<String, HashMap<String, JsonValue>>,
}

impl ViewState {
    /// Raw state object for the input identified by `block_id` / `action_id`.
    pub fn get(&self, block_id: &str, action_id: &str) -> Option<&JsonValue> {
        self.values.get(block_id)?.get(action_id)
    }

    /// Finds an input by action id alone, regardless of the enclosing block.
    pub fn find_action(&self, action_id: &str) -> Option<&JsonValue> {
        self.values.values().find_map(|inputs| inputs.get(action_id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionView {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub team_id: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub private_metadata: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub callback_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ViewState>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub clear_on_close: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub notify_on_close: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_view_id: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub root_view_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_installed_team_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bot_id: String,
}

/// Decoded `payload` of an interaction callback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    #[serde(rename = "type", default)]
    pub kind: InteractionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<InteractionUser>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_app_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<InteractionContainer>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub trigger_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<InteractionTeam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<InteractionChannel>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub response_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<InteractionAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<InteractionView>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub callback_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action_ts: String,
}

impl InteractionEvent {
    /// Workspace the interaction came from; empty when the payload carries no team.
    pub fn team_id(&self) -> &str {
        self.team.as_ref().map(|t| t.id.as_str()).unwrap_or_default()
    }

    /// `callback_id` of the attached view, empty when there is none.
    pub fn view_callback_id(&self) -> &str {
        self.view
            .as_ref()
            .map(|v| v.callback_id.as_str())
            .unwrap_or_default()
    }

    /// `action_id` of the first action; only the first action is routed.
    pub fn first_action_id(&self) -> Option<&str> {
        self.actions.first().map(|a| a.action_id.as_str())
    }
}

/// Typed view of a slash command's form body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashCommand {
    pub command: String,
    pub text: String,
    pub team_id: String,
    pub team_domain: String,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: String,
    pub response_url: String,
    pub trigger_id: String,
    pub api_app_id: String,
}

impl SlashCommand {
    /// Builds the command from decoded form fields; missing fields are left empty.
    pub fn from_form(form: &HashMap<String, String>) -> Self {
        let field = |name: &str| form.get(name).cloned().unwrap_or_default();
        Self {
            command: field("command"),
            text: field("text"),
            team_id: field("team_id"),
            team_domain: field("team_domain"),
            channel_id: field("channel_id"),
            channel_name: field("channel_name"),
            user_id: field("user_id"),
            user_name: field("user_name"),
            response_url: field("response_url"),
            trigger_id: field("trigger_id"),
            api_app_id: field("api_app_id"),
        }
    }
}

/// Decodes an `application/x-www-form-urlencoded` body.
///
/// Returns `None` when the body is not UTF-8 or carries a `%` not followed by
/// two hex digits. Repeated keys keep their first value.
pub fn parse_form(body: &[u8]) -> Option<HashMap<String, String>> {
    std::str::from_utf8(body).ok()?;
    if !has_valid_escapes(body) {
        return None;
    }
    let mut form = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(body) {
        form.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }
    Some(form)
}

fn has_valid_escapes(body: &[u8]) -> bool {
    let mut rest = body;
    while let Some(pos) = rest.iter().position(|&b| b == b'%') {
        match rest.get(pos + 1..pos + 3) {
            Some(hex) if hex.iter().all(u8::is_ascii_hexdigit) => rest = &rest[pos + 3..],
            _ => return false,
        }
    }
    true
}
