//! Workspace token registry
//!
//! In-memory mapping from Slack workspace (team) id to the bot access token
//! issued for that workspace. Tokens live only as long as the process.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Access token issued to the app for one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceToken {
    pub workspace_id: String,
    pub token: String,
}

impl WorkspaceToken {
    pub fn new(workspace_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            token: token.into(),
        }
    }
}

/// Registry holding at most one token per workspace.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: RwLock<HashMap<String, String>>,
}

impl TokenRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with `tokens`.
    pub fn with_tokens(tokens: impl IntoIterator<Item = WorkspaceToken>) -> Self {
        let registry = Self::new();
        registry.set_tokens(tokens);
        registry
    }

    /// Replace the entire collection. When a workspace appears twice the later entry wins.
    pub fn set_tokens(&self, tokens: impl IntoIterator<Item = WorkspaceToken>) {
        let replacement: HashMap<String, String> = tokens
            .into_iter()
            .map(|t| (t.workspace_id, t.token))
            .collect();
        let count = replacement.len();
        *self.tokens.write().unwrap_or_else(|e| e.into_inner()) = replacement;
        debug!(workspaces = count, "Workspace tokens replaced");
    }

    /// Register a token, replacing any token already held for the same workspace.
    ///
    /// Returns `true` when an existing token was replaced.
    pub fn add_token(&self, token: WorkspaceToken) -> bool {
        let mut guard = self.tokens.write().unwrap_or_else(|e| e.into_inner());
        let replaced = guard
            .insert(token.workspace_id.clone(), token.token)
            .is_some();
        info!(
            workspace_id = %token.workspace_id,
            replaced,
            "Workspace token registered"
        );
        replaced
    }

    /// Look up the token for `workspace_id`. `None` means the app is not installed there.
    pub fn find(&self, workspace_id: &str) -> Option<WorkspaceToken> {
        self.tokens
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(workspace_id)
            .map(|token| WorkspaceToken::new(workspace_id, token.clone()))
    }

    pub fn len(&self) -> usize {
        self.tokens.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All tokens, ordered by workspace id.
    pub fn snapshot(&self) -> Vec<WorkspaceToken> {
        let mut tokens: Vec<WorkspaceToken> = self
            .tokens
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(workspace, token)| WorkspaceToken::new(workspace.clone(), token.clone()))
            .collect();
        tokens.sort_by(|a, b| a.workspace_id.cmp(&b.workspace_id));
        tokens
    }
}
