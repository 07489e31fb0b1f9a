//! Request context and handler traits
//!
//! Application handlers receive a [`RequestContext`] for the verified request
//! and return the response that is sent back to Slack.

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::event::{InteractionEvent, SlashCommand, parse_form};
use crate::install::OAuthAccessResponse;

/// Everything a handler needs to act on one verified Slack request.
#[derive(Debug)]
pub struct RequestContext {
    /// Raw request body exactly as signed by Slack.
    pub body: Bytes,
    /// Bot token of the workspace the request came from.
    pub token: String,
    pub workspace_id: String,
    /// Method, URI, headers and extensions of the underlying request.
    pub parts: Parts,
}

impl RequestContext {
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Decoded form fields of the body.
    pub fn form(&self) -> HashMap<String, String> {
        parse_form(&self.body).unwrap_or_default()
    }

    pub fn form_value(&self, key: &str) -> Option<String> {
        self.form().remove(key)
    }

    /// Typed slash command fields (empty for interaction requests).
    pub fn slash_command(&self) -> SlashCommand {
        SlashCommand::from_form(&self.form())
    }

    /// Re-decodes the interaction `payload` field.
    pub fn interaction(&self) -> Result<InteractionEvent, serde_json::Error> {
        let payload = self.form_value("payload").unwrap_or_default();
        serde_json::from_str(&payload)
    }
}

/// Handler for a command, shortcut, action, or view callback.
#[async_trait]
pub trait SlackHandler: Send + Sync {
    async fn handle(&self, ctx: RequestContext) -> Response;
}

#[async_trait]
impl<F, Fut, R> SlackHandler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    async fn handle(&self, ctx: RequestContext) -> Response {
        (self)(ctx).await.into_response()
    }
}

/// Data handed to the post-install hook.
#[derive(Debug)]
pub struct InstallContext {
    pub access: OAuthAccessResponse,
    pub parts: Parts,
}

/// Runs after a workspace installs the app.
///
/// Returning `Some(response)` replaces the default success page.
#[async_trait]
pub trait InstallHook: Send + Sync {
    async fn on_install(&self, ctx: InstallContext) -> Option<Response>;
}

#[async_trait]
impl<F, Fut> InstallHook for F
where
    F: Fn(InstallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<Response>> + Send + 'static,
{
    async fn on_install(&self, ctx: InstallContext) -> Option<Response> {
        (self)(ctx).await
    }
}

/// Builds a response from a status, raw body, and optional headers.
///
/// Headers that are not valid HTTP header names or values are skipped.
pub fn respond(status: StatusCode, body: impl Into<Body>, headers: &[(&str, &str)]) -> Response {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => warn!(header = %name, "Skipping invalid response header"),
        }
    }
    response
}
