use std::collections::{BTreeMap, HashMap};

use reqflow_core::domain::request::{RequestId, RequestKind};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

/// Resource type plus query parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    pub resource: String,
    pub params: BTreeMap<String, String>,
}

impl QueryKey {
    pub fn new(resource: impl Into<String>) -> Self {
        Self { resource: resource.into(), params: BTreeMap::new() }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn list(kind: RequestKind) -> Self {
        Self::new(kind.resource())
    }

    pub fn detail(kind: RequestKind, id: &RequestId) -> Self {
        Self::new(kind.resource()).with_param("id", id.0.clone())
    }

    fn is_detail(&self) -> bool {
        self.params.contains_key("id")
    }
}

/// Best-effort read cache shared by the services; mutations invalidate it.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, Value>>,
}

impl QueryCache {
    pub async fn get(&self, key: &QueryKey) -> Option<Value> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn insert(&self, key: QueryKey, value: Value) {
        self.entries.write().await.insert(key, value);
    }

    pub async fn invalidate(&self, key: &QueryKey) -> bool {
        let removed = self.entries.write().await.remove(key).is_some();
        debug!(
            event_name = "client.cache.invalidated",
            resource = %key.resource,
            removed,
            "query cache entry invalidated"
        );
        removed
    }

    /// Drops every list query for the kind, whatever its parameters.
    pub async fn invalidate_lists(&self, kind: RequestKind) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| key.resource != kind.resource() || key.is_detail());
        let removed = before - entries.len();
        debug!(
            event_name = "client.cache.invalidated",
            resource = kind.resource(),
            removed,
            "list queries invalidated"
        );
        removed
    }

    pub async fn invalidate_detail(&self, kind: RequestKind, id: &RequestId) -> bool {
        self.invalidate(&QueryKey::detail(kind, id)).await
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
