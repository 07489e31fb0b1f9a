//! Install redirect: `GET /{prefix}/install?code=...`
//!
//! Not signature verified; Slack sends the browser here after the user
//! approves the app.

use axum::{
    extract::{Query, Request, State},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::info;

use crate::context::InstallContext;
use crate::install::{InstallError, OAuthAccessResponse, success_page};
use crate::server::AppState;
use crate::telemetry;
use crate::tokens::WorkspaceToken;

#[derive(Debug, Default, Deserialize)]
pub struct InstallQuery {
    #[serde(default)]
    pub code: Option<String>,
    /// Set by Slack instead of `code` when the user cancels (`access_denied`).
    #[serde(default)]
    pub error: Option<String>,
}

pub async fn install(State(state): State<AppState>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();

    match exchange(&state, &parts).await {
        Ok(access) => {
            telemetry::record_install("installed");
            complete(&state, access, parts).await
        }
        Err(error) => {
            telemetry::record_install(error.outcome());
            error.into_response()
        }
    }
}

async fn exchange(state: &AppState, parts: &Parts) -> Result<OAuthAccessResponse, InstallError> {
    let query = Query::<InstallQuery>::try_from_uri(&parts.uri)
        .map(|Query(query)| query)
        .unwrap_or_default();

    let code = match (query.code, query.error) {
        (_, Some(reason)) => return Err(InstallError::MissingCode { reason: Some(reason) }),
        (Some(code), None) if !code.trim().is_empty() => code,
        _ => return Err(InstallError::MissingCode { reason: None }),
    };

    state.installer.exchange(&code).await
}

async fn complete(state: &AppState, access: OAuthAccessResponse, parts: Parts) -> Response {
    state.tokens.add_token(WorkspaceToken::new(
        access.team.id.clone(),
        access.access_token.clone(),
    ));
    info!(
        workspace_id = %access.team.id,
        workspace_name = %access.team.name,
        "App installed to workspace"
    );

    if let Some(hook) = state.install_hook()
        && let Some(response) = hook.on_install(InstallContext { access, parts }).await
    {
        return response;
    }

    success_page(&state.config.app_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_query_parses_code_and_error() {
        let uri = "/slack/install?code=abc&state=xyz".parse().unwrap();
        let Query(query) = Query::<InstallQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.code.as_deref(), Some("abc"));
        assert!(query.error.is_none());

        let uri = "/slack/install?error=access_denied".parse().unwrap();
        let Query(query) = Query::<InstallQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.error.as_deref(), Some("access_denied"));
        assert!(query.code.is_none());
    }
}
