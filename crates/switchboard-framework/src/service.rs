//! Opaque service boundaries.
//!
//! The framework consumes two external services as black boxes:
//!
//! - [`ConfigLookup`]: key-value configuration lookup (`get(key) -> value`)
//! - [`UserStore`]: token-to-user resolution (`user_from_auth_token(token) -> user id`)
//!
//! Both are bundled into [`Services`] and handed to plugins at load time via
//! [`PluginLoadContext`](crate::plugin::PluginLoadContext).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

// ============================================================================
// Configuration lookup
// ============================================================================

/// Key-value configuration lookup.
pub trait ConfigLookup: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<Value>;
}

/// A [`ConfigLookup`] over a JSON value, addressed by dotted paths.
///
/// ```rust,ignore
/// let lookup = ValueLookup::new(json!({ "deploy": { "default_env": "staging" } }));
/// assert_eq!(lookup.get("deploy.default_env"), Some(json!("staging")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValueLookup {
    root: Arc<Value>,
}

impl ValueLookup {
    pub fn new(root: Value) -> Self {
        Self { root: Arc::new(root) }
    }
}

impl ConfigLookup for ValueLookup {
    fn get(&self, key: &str) -> Option<Value> {
        if key.is_empty() {
            return None;
        }
        key.split('.')
            .try_fold(self.root.as_ref(), |node, segment| match node {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
            .cloned()
    }
}

// ============================================================================
// User store
// ============================================================================

/// Persisted user/session lookup.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Resolves an authentication token to a user id.
    async fn user_from_auth_token(&self, token: &str) -> Option<String>;
}

/// An in-memory [`UserStore`].
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    tokens: RwLock<HashMap<String, String>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `token` with `user_id`, replacing any previous association.
    pub fn insert(&self, token: impl Into<String>, user_id: impl Into<String>) {
        self.tokens.write().insert(token.into(), user_id.into());
    }

    /// Removes `token`, returning the user it resolved to.
    pub fn revoke(&self, token: &str) -> Option<String> {
        self.tokens.write().remove(token)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn user_from_auth_token(&self, token: &str) -> Option<String> {
        self.tokens.read().get(token).cloned()
    }
}

// ============================================================================
// Services
// ============================================================================

/// The external services available to plugins.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<dyn ConfigLookup>,
    pub users: Arc<dyn UserStore>,
}

impl Services {
    pub fn new(config: Arc<dyn ConfigLookup>, users: Arc<dyn UserStore>) -> Self {
        Self { config, users }
    }
}

impl Default for Services {
    fn default() -> Self {
        Self {
            config: Arc::new(ValueLookup::default()),
            users: Arc::new(MemoryUserStore::new()),
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
