//! Install redirect tests with a mocked `oauth.v2.access` endpoint.

use std::time::Duration;

use axum::response::IntoResponse;
use reqwest::StatusCode;
use serde_json::json;
use slackhook::{AppConfig, InstallContext, RequestContext, SlackApp};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{post_signed, spawn_test_app, test_config};

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        oauth_access_url: format!("{}/api/oauth.v2.access", server.uri()),
        install_timeout_seconds: 1,
        ..test_config()
    }
}

async fn mock_access(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/api/oauth.v2.access"))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_successful_install_registers_token_and_renders_page() {
    let slack = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/oauth.v2.access"))
        .and(body_string_contains("code=abc"))
        .and(body_string_contains("client_id=123.456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "access_token": "tok",
            "token_type": "bot",
            "scope": "commands,chat:write",
            "bot_user_id": "B9",
            "app_id": "A1",
            "team": { "id": "T9", "name": "Nine" },
            "enterprise": null,
            "authed_user": { "id": "U9" }
        })))
        .expect(1)
        .mount(&slack)
        .await;

    let app = SlackApp::new(config_for(&slack)).unwrap();
    app.on_command("/ping", |ctx: RequestContext| async move { ctx.token });
    let (server_url, handle) = spawn_test_app(&app).await;

    let response = reqwest::get(format!("{}/slack/install?code=abc", server_url))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/html; charset=utf-8"
    );
    let page = response.text().await.unwrap();
    assert!(page.contains("Test Bot was installed"));

    assert_eq!(app.find_token("T9").unwrap().token, "tok");

    // The new workspace can now use commands.
    let client = reqwest::Client::new();
    let response = post_signed(
        &client,
        &format!("{}/slack/commands", server_url),
        "team_id=T9&command=%2Fping",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "tok");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_install_hook_can_replace_page() {
    let slack = MockServer::start().await;
    mock_access(
        &slack,
        ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "access_token": "tok",
            "team": { "id": "T9", "name": "Nine" }
        })),
    )
    .await;

    let app = SlackApp::new(config_for(&slack)).unwrap();
    app.on_app_install(|ctx: InstallContext| async move {
        let location = format!("https://example.com/welcome/{}", ctx.access.team.id);
        Some(axum::response::Redirect::to(&location).into_response())
    });
    let (server_url, handle) = spawn_test_app(&app).await;

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    let response = client
        .get(format!("{}/slack/install?code=abc", server_url))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()["location"],
        "https://example.com/welcome/T9"
    );
    assert!(app.find_token("T9").is_some());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_install_hook_returning_none_keeps_default_page() {
    let slack = MockServer::start().await;
    mock_access(
        &slack,
        ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "access_token": "tok",
            "team": { "id": "T9" }
        })),
    )
    .await;

    let app = SlackApp::new(config_for(&slack)).unwrap();
    app.on_app_install(|_ctx: InstallContext| async { None::<axum::response::Response> });
    let (server_url, handle) = spawn_test_app(&app).await;

    let response = reqwest::get(format!("{}/slack/install?code=abc", server_url))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("Test Bot"));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reinstall_replaces_token() {
    let slack = MockServer::start().await;
    mock_access(
        &slack,
        ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "access_token": "xoxb-new",
            "team": { "id": "T1" }
        })),
    )
    .await;

    let app = SlackApp::new(config_for(&slack)).unwrap();
    let (server_url, handle) = spawn_test_app(&app).await;
    assert_eq!(app.find_token("T1").unwrap().token, "xoxb-1");

    let response = reqwest::get(format!("{}/slack/install?code=again", server_url))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.find_token("T1").unwrap().token, "xoxb-new");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_install_failures_map_to_server_errors() {
    let cases = [
        (
            ResponseTemplate::new(200).set_body_json(json!({ "ok": false, "error": "invalid_code" })),
            "Slack App Access Request is not Ok",
        ),
        (
            ResponseTemplate::new(200).set_body_string("not json"),
            "Unable to get Slack OAuth2 Access Response for workspace",
        ),
        (
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ok": true }))
                .set_delay(Duration::from_secs(3)),
            "Unable to authorize Slack App for workspace",
        ),
    ];

    for (template, expected) in cases {
        let slack = MockServer::start().await;
        mock_access(&slack, template).await;

        let app = SlackApp::new(config_for(&slack)).unwrap();
        let (server_url, handle) = spawn_test_app(&app).await;

        let response = reqwest::get(format!("{}/slack/install?code=abc", server_url))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text().await.unwrap(), expected);
        assert!(app.find_token("T9").is_none());

        handle.shutdown().await.unwrap();
    }
}

#[tokio::test]
async fn test_unreachable_token_endpoint() {
    let app = SlackApp::new(AppConfig {
        oauth_access_url: "http://127.0.0.1:1/api/oauth.v2.access".to_string(),
        ..test_config()
    })
    .unwrap();
    let (server_url, handle) = spawn_test_app(&app).await;

    let response = reqwest::get(format!("{}/slack/install?code=abc", server_url))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.text().await.unwrap(),
        "Unable to authorize Slack App for workspace"
    );

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_denied_install_does_not_call_slack() {
    let slack = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&slack)
        .await;

    let app = SlackApp::new(config_for(&slack)).unwrap();
    let (server_url, handle) = spawn_test_app(&app).await;

    let response = reqwest::get(format!(
        "{}/slack/install?error=access_denied&state=xyz",
        server_url
    ))
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text().await.unwrap(),
        "Missing authorization code"
    );

    handle.shutdown().await.unwrap();
}
