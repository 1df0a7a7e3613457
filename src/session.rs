//! Session-store contract. The store itself lives with the HTTP layer;
//! the core only needs a handful of key/value operations per request.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Key-value view of one request's session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn put(&self, key: &str, value: &str);
    async fn exists(&self, key: &str) -> bool;
    /// Remove and return the value (flash-message semantics).
    async fn pop(&self, key: &str) -> Option<String>;
    /// Rotate the store's own session identifier (fixation defense).
    async fn renew_token(&self);
}

/// In-process store for tests and single-process deployments. Token
/// rotation is a no-op here; there is no transport-level identifier to
/// rotate.
#[derive(Default)]
pub struct MemorySessionStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.values.read().expect("session lock poisoned").get(key).cloned()
    }

    async fn put(&self, key: &str, value: &str) {
        self.values
            .write()
            .expect("session lock poisoned")
            .insert(key.to_string(), value.to_string());
    }

    async fn exists(&self, key: &str) -> bool {
        self.values.read().expect("session lock poisoned").contains_key(key)
    }

    async fn pop(&self, key: &str) -> Option<String> {
        self.values.write().expect("session lock poisoned").remove(key)
    }

    async fn renew_token(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_exists_pop() {
        let store = MemorySessionStore::new();
        assert!(!store.exists("auth").await);
        store.put("auth", "token").await;
        assert!(store.exists("auth").await);
        assert_eq!(store.get("auth").await.as_deref(), Some("token"));
        assert_eq!(store.pop("auth").await.as_deref(), Some("token"));
        assert!(!store.exists("auth").await);
    }
}
