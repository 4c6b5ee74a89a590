use std::sync::Arc;

use reqflow_core::domain::project::Project;
use reqflow_core::domain::request::{Request, RequestId, RequestKind};
use reqflow_core::domain::user::User;
use reqflow_core::wire::{Endpoint, Outbound, ServerVerdict};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::api::{ApiError, Transport};
use crate::cache::{QueryCache, QueryKey};

/// Read side: fetches through the shared cache so mutations can invalidate it.
pub struct Queries {
    transport: Arc<dyn Transport>,
    cache: Arc<QueryCache>,
}

impl Queries {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<QueryCache>) -> Self {
        Self { transport, cache }
    }

    pub async fn fetch<G: DeserializeOwned + Default>(
        &self,
        kind: RequestKind,
        id: &RequestId,
    ) -> Result<Request<G>, ApiError> {
        let request: Request<G> =
            self.cached(QueryKey::detail(kind, id), Endpoint::Detail(kind, id.clone())).await?;
        Ok(request.tagged(kind))
    }

    pub async fn list<G: DeserializeOwned + Default>(
        &self,
        kind: RequestKind,
    ) -> Result<Vec<Request<G>>, ApiError> {
        let requests: Vec<Request<G>> =
            self.cached(QueryKey::list(kind), Endpoint::List(kind)).await?;
        Ok(requests.into_iter().map(|request| request.tagged(kind)).collect())
    }

    pub async fn reviewers(&self) -> Result<Vec<User>, ApiError> {
        self.cached(QueryKey::new("reviewers"), Endpoint::Reviewers).await
    }

    pub async fn admins(&self) -> Result<Vec<User>, ApiError> {
        self.cached(QueryKey::new("admins"), Endpoint::Admins).await
    }

    pub async fn projects(&self) -> Result<Vec<Project>, ApiError> {
        self.cached(QueryKey::new("projects"), Endpoint::Projects).await
    }

    async fn cached<T: DeserializeOwned>(
        &self,
        key: QueryKey,
        endpoint: Endpoint,
    ) -> Result<T, ApiError> {
        if let Some(hit) = self.cache.get(&key).await {
            debug!(event_name = "query.cache_hit", resource = %key.resource, "served from cache");
            return decode(hit);
        }

        let data = match self.transport.send(&Outbound::bodyless(endpoint)).await?.verdict() {
            ServerVerdict::Accepted { data, .. } => data.unwrap_or(Value::Null),
            ServerVerdict::Rejected { message } => return Err(ApiError::Rejected(message)),
        };
        let decoded = decode(data.clone())?;
        self.cache.insert(key, data).await;
        Ok(decoded)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|error| ApiError::Decode(error.to_string()))
}
