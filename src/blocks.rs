//! # Block Kit
//!
//! Typed builders for the Block Kit JSON handlers send back to Slack (modals,
//! message blocks). Every type is tagged by its `type` field and omits absent
//! or empty fields, matching what Slack accepts.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;

fn is_false(value: &bool) -> bool {
    !*value
}

/// A text object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    PlainText {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        text: String,
        #[serde(default, skip_serializing_if = "is_false")]
        emoji: bool,
    },
    Mrkdwn {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        text: String,
    },
}

impl Text {
    pub fn plain(text: impl Into<String>) -> Self {
        Text::PlainText {
            text: text.into(),
            emoji: false,
        }
    }

    /// Plain text with emoji shortcodes rendered.
    pub fn emoji(text: impl Into<String>) -> Self {
        Text::PlainText {
            text: text.into(),
            emoji: true,
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Text::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Text::PlainText { text, .. } | Text::Mrkdwn { text } => text,
        }
    }
}

/// An option of a select, checkbox group, or radio group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionObject {
    pub text: Text,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

/// Interactive and display elements placed inside blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Button {
        text: Text,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        value: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        action_id: String,
    },
    PlainTextInput {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        action_id: String,
        #[serde(default, skip_serializing_if = "is_false")]
        multiline: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<u16>,
    },
    StaticSelect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<Text>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        options: Vec<OptionObject>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_option: Option<OptionObject>,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        action_id: String,
    },
    MultiStaticSelect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<Text>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        options: Vec<OptionObject>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        initial_options: Vec<OptionObject>,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        action_id: String,
    },
    MultiConversationsSelect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<Text>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        initial_conversations: Vec<String>,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        action_id: String,
    },
    Datepicker {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        initial_date: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<Text>,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        action_id: String,
    },
    Timepicker {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        initial_time: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<Text>,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        action_id: String,
    },
    Checkboxes {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        options: Vec<OptionObject>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        initial_options: Vec<OptionObject>,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        action_id: String,
    },
    RadioButtons {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        options: Vec<OptionObject>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_option: Option<OptionObject>,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        action_id: String,
    },
    Image {
        image_url: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        alt_text: String,
    },
}

/// Layout blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<Text>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        fields: Vec<Text>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        accessory: Option<Element>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
    },
    Actions {
        elements: Vec<Element>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
    },
    Context {
        elements: Vec<Text>,
    },
    Input {
        #[serde(default, skip_serializing_if = "is_false")]
        dispatch_action: bool,
        element: Element,
        label: Text,
        #[serde(default, skip_serializing_if = "is_false")]
        optional: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
    },
    Header {
        text: Text,
    },
    Divider,
    Image {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<Text>,
        image_url: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        alt_text: String,
    },
}

impl Block {
    /// Sets `block_id` on blocks that carry one; other blocks are returned unchanged.
    pub fn with_block_id(mut self, id: impl Into<String>) -> Self {
        match &mut self {
            Block::Section { block_id, .. }
            | Block::Actions { block_id, .. }
            | Block::Input { block_id, .. } => *block_id = Some(id.into()),
            _ => {}
        }
        self
    }

    /// Marks an input block as optional.
    pub fn optional(mut self) -> Self {
        if let Block::Input { optional, .. } = &mut self {
            *optional = true;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    #[default]
    Modal,
    Home,
}

/// A modal (or home tab) view, as passed to `views.open` / `views.update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modal {
    #[serde(rename = "type", default)]
    pub kind: ViewType,
    pub title: Text,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<Text>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub callback_id: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub notify_on_close: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub private_metadata: String,
}

impl Modal {
    pub fn with_private_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.private_metadata = metadata.into();
        self
    }
}

impl IntoResponse for Modal {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    InChannel,
    Ephemeral,
}

/// A message body: a direct handler response or a `response_url` post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Fallback text for notifications.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub replace_original: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub delete_original: bool,
}

impl Message {
    pub fn new(text: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            text: text.into(),
            blocks,
            ..Default::default()
        }
    }

    pub fn ephemeral(mut self) -> Self {
        self.response_type = Some(ResponseType::Ephemeral);
        self
    }

    pub fn in_channel(mut self) -> Self {
        self.response_type = Some(ResponseType::InChannel);
        self
    }
}

impl IntoResponse for Message {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

pub fn button(text: &str, value: &str, action_id: &str) -> Element {
    Element::Button {
        text: Text::emoji(text),
        value: value.to_string(),
        action_id: action_id.to_string(),
    }
}

/// Builds a modal. Empty `submit` / `close` labels leave Slack's defaults.
pub fn modal(
    title: &str,
    callback_id: &str,
    blocks: Vec<Block>,
    submit: &str,
    close: &str,
    notify_on_close: bool,
) -> Modal {
    let label = |text: &str| (!text.is_empty()).then(|| Text::plain(text));
    Modal {
        kind: ViewType::Modal,
        title: Text::plain(title),
        submit: label(submit),
        close: label(close),
        blocks,
        callback_id: callback_id.to_string(),
        notify_on_close,
        private_metadata: String::new(),
    }
}

pub fn actions(elements: Vec<Element>) -> Block {
    Block::Actions {
        elements,
        block_id: None,
    }
}

fn input(label: &str, element: Element) -> Block {
    Block::Input {
        dispatch_action: false,
        element,
        label: Text::emoji(label),
        optional: false,
        block_id: None,
    }
}

/// Text input; `max_length` of 0 means unlimited.
pub fn text_input(
    label: &str,
    action_id: &str,
    multiline: bool,
    dispatch_action: bool,
    max_length: u16,
) -> Block {
    let mut block = input(
        label,
        Element::PlainTextInput {
            action_id: action_id.to_string(),
            multiline,
            max_length: (max_length > 0).then_some(max_length),
        },
    );
    if let Block::Input {
        dispatch_action: dispatch,
        ..
    } = &mut block
    {
        *dispatch = dispatch_action;
    }
    block
}

/// Single or multi static select over `options`.
pub fn static_select(
    label: &str,
    placeholder: &str,
    options: Vec<OptionObject>,
    initial: Option<OptionObject>,
    action_id: &str,
    multi: bool,
) -> Block {
    let placeholder = Some(Text::emoji(placeholder));
    let action_id = action_id.to_string();
    let element = if multi {
        Element::MultiStaticSelect {
            placeholder,
            options,
            initial_options: initial.into_iter().collect(),
            action_id,
        }
    } else {
        Element::StaticSelect {
            placeholder,
            options,
            initial_option: initial,
            action_id,
        }
    };
    input(label, element)
}

pub fn multi_conversations_select(
    label: &str,
    placeholder: &str,
    initial_conversations: Vec<String>,
    action_id: &str,
) -> Block {
    input(
        label,
        Element::MultiConversationsSelect {
            placeholder: Some(Text::emoji(placeholder)),
            initial_conversations,
            action_id: action_id.to_string(),
        },
    )
}

/// Date picker; `initial_date` is `YYYY-MM-DD` or empty.
pub fn date_picker(label: &str, placeholder: &str, initial_date: &str, action_id: &str) -> Block {
    input(
        label,
        Element::Datepicker {
            initial_date: initial_date.to_string(),
            placeholder: Some(Text::emoji(placeholder)),
            action_id: action_id.to_string(),
        },
    )
}

/// Time picker; `initial_time` is `HH:mm` or empty.
pub fn time_picker(label: &str, initial_time: &str, action_id: &str) -> Block {
    input(
        label,
        Element::Timepicker {
            initial_time: initial_time.to_string(),
            placeholder: None,
            action_id: action_id.to_string(),
        },
    )
}

pub fn checkboxes(
    label: &str,
    options: Vec<OptionObject>,
    initial_options: Vec<OptionObject>,
    action_id: &str,
) -> Block {
    input(
        label,
        Element::Checkboxes {
            options,
            initial_options,
            action_id: action_id.to_string(),
        },
    )
}

pub fn radio_buttons(label: &str, options: Vec<OptionObject>, action_id: &str) -> Block {
    input(
        label,
        Element::RadioButtons {
            options,
            initial_option: None,
            action_id: action_id.to_string(),
        },
    )
}

pub fn option(text: &str, value: &str) -> OptionObject {
    OptionObject {
        text: Text::emoji(text),
        value: value.to_string(),
    }
}

pub fn header(text: &str) -> Block {
    Block::Header {
        text: Text::emoji(text),
    }
}

pub fn divider() -> Block {
    Block::Divider
}

pub fn context(text: &str) -> Block {
    Block::Context {
        elements: vec![Text::plain(text)],
    }
}

pub fn image(title: &str, image_url: &str, alt_text: &str) -> Block {
    Block::Image {
        title: (!title.is_empty()).then(|| Text::emoji(title)),
        image_url: image_url.to_string(),
        alt_text: alt_text.to_string(),
    }
}

/// Re-decodes an opaque JSON value (view state, view blocks) into `T`.
pub fn convert_state<T: DeserializeOwned>(state: &JsonValue) -> Result<T, serde_json::Error> {
    T::deserialize(state)
}
