//! OAuth2 install exchange
//!
//! Trades the one-time `code` Slack appends to the install redirect for a
//! workspace bot token via `oauth.v2.access`.

use std::time::Duration;

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::AppConfig;

/// Page returned once a workspace finished installing the app.
pub const INSTALL_SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{{APP_NAME}} installed</title>
  <style>
    body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif; margin: 4rem auto; max-width: 36rem; color: #1d1c1d; }
    h1 { font-size: 1.5rem; }
  </style>
</head>
<body>
  <h1>{{APP_NAME}} was installed to your workspace</h1>
  <p>You can close this window and return to Slack.</p>
</body>
</html>
"#;

const APP_NAME_PLACEHOLDER: &str = "{{APP_NAME}}";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTeam {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthEnterprise {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// The installing user's own grant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthAuthedUser {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
}

/// Body of an `oauth.v2.access` response. Unknown fields are ignored and
/// missing ones default, so only `ok` decides success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthAccessResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub bot_user_id: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub team: OAuthTeam,
    #[serde(default, deserialize_with = "null_as_default")]
    pub enterprise: OAuthEnterprise,
    #[serde(default)]
    pub authed_user: OAuthAuthedUser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// Slack sends `"enterprise": null` for workspaces outside an Enterprise Grid.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Install flow failures; every variant ends the request with a plain-text body.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Missing authorization code")]
    MissingCode { reason: Option<String> },

    #[error("Unable to authorize Slack App for workspace")]
    Transport(#[source] reqwest::Error),

    #[error("Unable to get Slack OAuth2 Access Response for workspace")]
    Decode(#[source] serde_json::Error),

    #[error("Slack App Access Request is not Ok")]
    NotOk { error: Option<String> },
}

impl InstallError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            InstallError::MissingCode { .. } => StatusCode::BAD_REQUEST,
            InstallError::Transport(_) | InstallError::Decode(_) | InstallError::NotOk { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Label used for the `outcome` metric dimension.
    pub fn outcome(&self) -> &'static str {
        match self {
            InstallError::MissingCode { .. } => "missing_code",
            InstallError::Transport(_) => "transport_error",
            InstallError::Decode(_) => "decode_error",
            InstallError::NotOk { .. } => "not_ok",
        }
    }
}

impl IntoResponse for InstallError {
    fn into_response(self) -> Response {
        match &self {
            InstallError::MissingCode { reason } => {
                debug!(reason = ?reason, "Install redirect carried no authorization code");
            }
            InstallError::Transport(err) => {
                error!(error = %err, timeout = err.is_timeout(), "Slack OAuth access request failed");
            }
            InstallError::Decode(err) => {
                error!(error = %err, "Slack OAuth access response could not be decoded");
            }
            InstallError::NotOk { error } => {
                error!(slack_error = ?error, "Slack OAuth access response was not ok");
            }
        }
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Client for the `oauth.v2.access` endpoint.
#[derive(Debug, Clone)]
pub struct InstallExchange {
    http: reqwest::Client,
    access_url: String,
    client_id: String,
    client_secret: String,
}

impl InstallExchange {
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.install_timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            access_url: config.oauth_access_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    pub fn access_url(&self) -> &str {
        &self.access_url
    }

    /// Exchanges `code` for an access response. Only an `ok: true` response is returned.
    pub async fn exchange(&self, code: &str) -> Result<OAuthAccessResponse, InstallError> {
        debug!(access_url = %self.access_url, "Exchanging Slack authorization code");

        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.access_url)
            .form(&params)
            .send()
            .await
            .map_err(InstallError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(InstallError::Transport)?;
        debug!(status = %status, body_len = body.len(), "Slack OAuth access response received");

        let access: OAuthAccessResponse =
            serde_json::from_str(&body).map_err(InstallError::Decode)?;

        if !access.ok {
            return Err(InstallError::NotOk {
                error: access.error,
            });
        }

        Ok(access)
    }
}

/// Renders the success page for `app_name`.
pub fn success_page(app_name: &str) -> Response {
    let body = INSTALL_SUCCESS_PAGE.replace(APP_NAME_PLACEHOLDER, &html_escape(app_name));
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        )],
        body,
    )
        .into_response()
}

fn html_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> AppConfig {
        AppConfig {
            route_prefix: "slack".to_string(),
            signing_secret: "secret".to_string(),
            client_id: "123.456".to_string(),
            client_secret: "shh".to_string(),
            oauth_access_url: format!("{}/api/oauth.v2.access", server.uri()),
            install_timeout_seconds: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_access_response_tolerates_missing_and_null_fields() {
        let access: OAuthAccessResponse = serde_json::from_value(json!({
            "ok": true,
            "access_token": "xoxb-9",
            "team": { "id": "T9", "name": "Nine" },
            "enterprise": null,
            "incoming_webhook": { "url": "https://hooks.slack.com/x" }
        }))
        .unwrap();

        assert!(access.ok);
        assert_eq!(access.team.id, "T9");
        assert_eq!(access.enterprise, OAuthEnterprise::default());
        assert_eq!(access.authed_user.id, "");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;"
        );
    }

    #[tokio::test]
    async fn test_success_page_substitutes_escaped_name() {
        let response = success_page("Ops <Bot>");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Ops &lt;Bot&gt; was installed"));
        assert!(!body.contains(APP_NAME_PLACEHOLDER));
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(
            InstallError::MissingCode { reason: None }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            InstallError::NotOk { error: None }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let decode = serde_json::from_str::<OAuthAccessResponse>("nope").unwrap_err();
        assert_eq!(
            InstallError::Decode(decode).to_string(),
            "Unable to get Slack OAuth2 Access Response for workspace"
        );
    }

    #[tokio::test]
    async fn test_exchange_posts_form_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/oauth.v2.access"))
            .and(body_string_contains("code=abc"))
            .and(body_string_contains("client_id=123.456"))
            .and(body_string_contains("client_secret=shh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "access_token": "tok",
                "team": { "id": "T9" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let exchange = InstallExchange::new(&config_for(&server)).unwrap();
        let access = exchange.exchange("abc").await.unwrap();
        assert_eq!(access.access_token, "tok");
        assert_eq!(access.team.id, "T9");
    }

    #[tokio::test]
    async fn test_exchange_not_ok_and_decode_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("code=denied"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": false, "error": "invalid_code" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("code=garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let exchange = InstallExchange::new(&config_for(&server)).unwrap();

        match exchange.exchange("denied").await {
            Err(InstallError::NotOk { error }) => assert_eq!(error.as_deref(), Some("invalid_code")),
            other => panic!("expected NotOk, got {other:?}"),
        }
        assert!(matches!(
            exchange.exchange("garbled").await,
            Err(InstallError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_exchange_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": true }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let exchange = InstallExchange::new(&config_for(&server)).unwrap();
        match exchange.exchange("slow").await {
            Err(InstallError::Transport(err)) => assert!(err.is_timeout()),
            other => panic!("expected Transport, got {other:?}"),
        }
    }
}
