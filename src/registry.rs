//! Handler registry
//!
//! Five independent tables mapping a routing key (command name, shortcut
//! callback id, action id, view callback ids) to the application handler.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::context::SlackHandler;

pub type SharedHandler = Arc<dyn SlackHandler>;

/// Which table a handler lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Command,
    Shortcut,
    Action,
    ViewSubmission,
    ViewClosed,
}

impl HandlerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::Command => "command",
            HandlerKind::Shortcut => "shortcut",
            HandlerKind::Action => "action",
            HandlerKind::ViewSubmission => "view_submission",
            HandlerKind::ViewClosed => "view_closed",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One key → handler table. The last registration for a key wins.
#[derive(Default)]
pub struct HandlerTable {
    handlers: RwLock<HashMap<String, SharedHandler>>,
}

impl HandlerTable {
    /// Returns `true` when an existing handler was replaced.
    pub fn insert(&self, key: impl Into<String>, handler: SharedHandler) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), handler)
            .is_some()
    }

    pub fn remove(&self, key: &str) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some()
    }

    /// Clones the handler out so no lock is held while it runs.
    pub fn get(&self, key: &str) -> Option<SharedHandler> {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handlers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("keys", &self.keys())
            .finish()
    }
}

/// All handler tables of one app.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    commands: HandlerTable,
    shortcuts: HandlerTable,
    actions: HandlerTable,
    view_submissions: HandlerTable,
    view_closes: HandlerTable,
}

impl HandlerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, kind: HandlerKind) -> &HandlerTable {
        match kind {
            HandlerKind::Command => &self.commands,
            HandlerKind::Shortcut => &self.shortcuts,
            HandlerKind::Action => &self.actions,
            HandlerKind::ViewSubmission => &self.view_submissions,
            HandlerKind::ViewClosed => &self.view_closes,
        }
    }

    pub fn register(&self, kind: HandlerKind, key: impl Into<String>, handler: SharedHandler) {
        let key = key.into();
        let replaced = self.table(kind).insert(key.clone(), handler);
        debug!(kind = %kind, key = %key, replaced, "Handler registered");
    }

    pub fn lookup(&self, kind: HandlerKind, key: &str) -> Option<SharedHandler> {
        self.table(kind).get(key)
    }

    pub fn remove_command(&self, command: &str) -> bool {
        self.commands.remove(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use axum::response::Response;

    fn handler(tag: &'static str) -> SharedHandler {
        Arc::new(move |_ctx: RequestContext| async move {
            Response::new(axum::body::Body::from(tag))
        })
    }

    #[test]
    fn test_tables_are_independent() {
        let registry = HandlerRegistry::new();
        registry.register(HandlerKind::Action, "shared_key", handler("action"));

        assert!(registry.lookup(HandlerKind::Action, "shared_key").is_some());
        for kind in [
            HandlerKind::Command,
            HandlerKind::Shortcut,
            HandlerKind::ViewSubmission,
            HandlerKind::ViewClosed,
        ] {
            assert!(registry.lookup(kind, "shared_key").is_none(), "{kind}");
        }
    }

    #[test]
    fn test_reregistration_replaces_handler() {
        let registry = HandlerRegistry::new();
        let first = handler("first");
        let second = handler("second");
        registry.register(HandlerKind::Command, "/ping", first);
        registry.register(HandlerKind::Command, "/ping", second.clone());

        let table = registry.table(HandlerKind::Command);
        assert_eq!(table.len(), 1);
        let found = registry.lookup(HandlerKind::Command, "/ping").unwrap();
        assert!(Arc::ptr_eq(&found, &second));
    }

    #[test]
    fn test_remove_command() {
        let registry = HandlerRegistry::new();
        registry.register(HandlerKind::Command, "/ping", handler("ping"));

        assert!(registry.remove_command("/ping"));
        assert!(!registry.remove_command("/ping"));
        assert!(registry.table(HandlerKind::Command).is_empty());
    }

    #[test]
    fn test_keys_are_sorted() {
        let registry = HandlerRegistry::new();
        registry.register(HandlerKind::Shortcut, "b", handler("b"));
        registry.register(HandlerKind::Shortcut, "a", handler("a"));

        assert_eq!(registry.table(HandlerKind::Shortcut).keys(), vec!["a", "b"]);
    }
}
