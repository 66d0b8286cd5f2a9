//! Ports between the repository and a document store
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              Repository<T>               │
//! │  CRUD / paging / cancellation / logging  │
//! └──────────────────────────────────────────┘
//!                     │ Arc<dyn DocumentCollection<T>>
//!                     ▼
//! ┌──────────────────────────────────────────┐
//! │         DocumentCollection<T>            │
//! │   native operations of one collection    │
//! └──────────────────────────────────────────┘
//!          ▲                       ▲
//!  ┌───────┴────────┐     ┌────────┴────────┐
//!  │  PgCollection  │     │MemoryCollection │
//!  │  (JSONB table) │     │  (in process)   │
//!  └────────────────┘     └─────────────────┘
//! ```
//!
//! A [`CollectionContext`] hands out collection handles. The repository asks
//! for its handle once, at construction, and never manages its lifecycle.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::entity::Entity;
use crate::error::StoreResult;
use crate::filter::Filter;
use crate::paging::FindOptions;

/// Native operations on one collection of `T`
///
/// Implementations must be safe for concurrent use; the repository adds no
/// locking of its own.
#[async_trait]
pub trait DocumentCollection<T: Entity>: Send + Sync {
    /// Name of the collection
    fn name(&self) -> &str;

    /// Inserts one entity, failing with a duplicate key error if its id exists
    async fn insert_one(&self, entity: &T) -> StoreResult<()>;

    /// Inserts all entities or none of them
    async fn insert_many(&self, entities: &[T]) -> StoreResult<()>;

    /// Counts documents matching the filter
    async fn count(&self, filter: &Filter) -> StoreResult<u64>;

    /// Deletes the first document matching the filter; returns 0 or 1
    async fn delete_one(&self, filter: &Filter) -> StoreResult<u64>;

    /// Returns matching documents, sorted and windowed per `options`
    async fn find(&self, filter: &Filter, options: &FindOptions) -> StoreResult<Vec<T>>;

    /// Returns the first matching document in the store's natural order
    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<T>>;

    /// Looks up a document by its serialised identifier
    async fn find_by_id(&self, id: &Value) -> StoreResult<Option<T>>;

    /// Deletes the document with this serialised identifier; returns 0 or 1
    async fn delete_by_id(&self, id: &Value) -> StoreResult<u64>;

    /// Replaces the stored document with the same id by the full `entity`
    ///
    /// Returns 1 when the stored document changed, 0 when no document has
    /// that id or the stored document is already identical.
    async fn replace_one(&self, entity: &T) -> StoreResult<u64>;
}

/// Supplies typed collection handles from a configured store
pub trait CollectionContext: Send + Sync {
    fn collection<T: Entity>(&self) -> Arc<dyn DocumentCollection<T>>;
}

/// Health status of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreHealth {
    Healthy,
    Unhealthy,
}

/// Health check result for a store context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Store identifier
    pub store_id: String,
    pub status: StoreHealth,
    /// Latency of the health check in milliseconds
    pub latency_ms: u64,
    /// Optional message with additional details
    pub message: Option<String>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl HealthCheckResult {
    pub fn is_healthy(&self) -> bool {
        self.status == StoreHealth::Healthy
    }
}

/// Trait for store contexts that support health checks
#[async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}
