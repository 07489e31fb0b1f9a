//! Test utilities: a real server on an ephemeral port plus Slack request signing.

#![allow(dead_code)]

use anyhow::{Context, Result as AnyhowResult};
use slackhook::webhook_verification::{SIGNATURE_HEADER, TIMESTAMP_HEADER, compute_signature};
use slackhook::{AppConfig, SlackApp, WorkspaceToken};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

pub const SIGNING_SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";

pub struct TestServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<AnyhowResult<()>>>,
}

impl TestServerHandle {
    fn new(shutdown_tx: oneshot::Sender<()>, join_handle: JoinHandle<AnyhowResult<()>>) -> Self {
        Self {
            shutdown_tx: Some(shutdown_tx),
            join_handle: Some(join_handle),
        }
    }

    pub async fn shutdown(mut self) -> AnyhowResult<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.join_handle.take() {
            let result = handle.await.context("server task join failed")?;
            result?;
        }

        Ok(())
    }
}

impl Drop for TestServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Config with the `slack` prefix, the shared signing secret, and T1 installed.
pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        app_name: "Test Bot".to_string(),
        route_prefix: "slack".to_string(),
        client_id: "123.456".to_string(),
        client_secret: "client-secret".to_string(),
        signing_secret: SIGNING_SECRET.to_string(),
        tokens: vec![WorkspaceToken::new("T1", "xoxb-1")],
        ..Default::default()
    }
}

/// Serves `app` on 127.0.0.1:0 and returns its base URL.
pub async fn spawn_test_app(app: &SlackApp) -> (String, TestServerHandle) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_url = format!("http://{}", addr);

    let (ready_tx, ready_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let app = app.clone();
    let server_task = tokio::spawn(async move {
        let server = app.serve(listener, async {
            let _ = shutdown_rx.await;
        });

        let _ = ready_tx.send(());

        server.await.context("slack server error")
    });

    ready_rx.await.expect("server task to signal readiness");

    (server_url, TestServerHandle::new(shutdown_tx, server_task))
}

pub fn now_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
        .to_string()
}

/// POSTs `body` to `url` signed the way Slack signs it.
pub async fn post_signed(
    client: &reqwest::Client,
    url: &str,
    body: impl Into<String>,
) -> reqwest::Response {
    let body = body.into();
    let timestamp = now_timestamp();
    client
        .post(url)
        .header("content-type", "application/x-www-form-urlencoded")
        .header(TIMESTAMP_HEADER, &timestamp)
        .header(
            SIGNATURE_HEADER,
            compute_signature(SIGNING_SECRET, &timestamp, body.as_bytes()),
        )
        .body(body)
        .send()
        .await
        .unwrap()
}

/// Form-encodes an interaction payload the way Slack posts it.
pub fn payload_form(payload: &serde_json::Value) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("payload", &payload.to_string())
        .finish()
}
