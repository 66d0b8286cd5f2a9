//! Fault injection for collections
//!
//! `FaultyCollection` wraps a real collection and can fail a chosen replace
//! or slow every call down. Tests use it to observe partial failure of
//! sequential updates and cancellation of calls already in flight.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use core_kernel::{DocumentCollection, Entity, Filter, FindOptions, StoreError, StoreResult};

pub struct FaultyCollection<T: Entity> {
    inner: Arc<dyn DocumentCollection<T>>,
    fail_replace_at: Option<usize>,
    latency: Option<Duration>,
    replace_attempts: AtomicUsize,
}

impl<T: Entity> FaultyCollection<T> {
    pub fn new(inner: Arc<dyn DocumentCollection<T>>) -> Self {
        Self {
            inner,
            fail_replace_at: None,
            latency: None,
            replace_attempts: AtomicUsize::new(0),
        }
    }

    /// Fails the replace attempt with this zero-based index
    pub fn failing_replace_at(mut self, attempt: usize) -> Self {
        self.fail_replace_at = Some(attempt);
        self
    }

    /// Delays every call by `latency` before it reaches the inner collection
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of replace calls received, including the failed one
    pub fn replace_attempts(&self) -> usize {
        self.replace_attempts.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl<T: Entity> DocumentCollection<T> for FaultyCollection<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn insert_one(&self, entity: &T) -> StoreResult<()> {
        self.delay().await;
        self.inner.insert_one(entity).await
    }

    async fn insert_many(&self, entities: &[T]) -> StoreResult<()> {
        self.delay().await;
        self.inner.insert_many(entities).await
    }

    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        self.delay().await;
        self.inner.count(filter).await
    }

    async fn delete_one(&self, filter: &Filter) -> StoreResult<u64> {
        self.delay().await;
        self.inner.delete_one(filter).await
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> StoreResult<Vec<T>> {
        self.delay().await;
        self.inner.find(filter, options).await
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<T>> {
        self.delay().await;
        self.inner.find_one(filter).await
    }

    async fn find_by_id(&self, id: &Value) -> StoreResult<Option<T>> {
        self.delay().await;
        self.inner.find_by_id(id).await
    }

    async fn delete_by_id(&self, id: &Value) -> StoreResult<u64> {
        self.delay().await;
        self.inner.delete_by_id(id).await
    }

    async fn replace_one(&self, entity: &T) -> StoreResult<u64> {
        let attempt = self.replace_attempts.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if self.fail_replace_at == Some(attempt) {
            return Err(StoreError::connectivity(format!(
                "injected failure on replace #{}",
                attempt
            )));
        }
        self.inner.replace_one(entity).await
    }
}
