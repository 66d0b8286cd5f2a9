//! In-process document collections
//!
//! The memory store keeps each collection as an insertion-ordered vector of
//! serialised documents. It follows the same filter, ordering and identifier
//! semantics as the PostgreSQL store, which makes it suitable for tests and
//! for embedding.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use core_kernel::filter::json_eq;
use core_kernel::{
    CollectionContext, Document, DocumentCollection, Entity, Filter, FindOptions,
    HealthCheckResult, HealthCheckable, StoreError, StoreHealth, StoreResult,
};

type SharedDocuments = Arc<RwLock<Vec<Document>>>;

/// Context holding named in-memory collections
///
/// Clones share the same collections. Two entity types with the same
/// `COLLECTION` name share one collection.
#[derive(Debug, Clone, Default)]
pub struct MemoryContext {
    collections: Arc<Mutex<HashMap<String, SharedDocuments>>>,
}

impl MemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the collections created so far
    pub fn collection_names(&self) -> Vec<String> {
        let collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        names
    }

    fn documents(&self, name: &str) -> SharedDocuments {
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        collections
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(collection = name, "Creating in-memory collection");
                Arc::default()
            })
            .clone()
    }
}

impl CollectionContext for MemoryContext {
    fn collection<T: Entity>(&self) -> Arc<dyn DocumentCollection<T>> {
        Arc::new(MemoryCollection::<T> {
            documents: self.documents(T::COLLECTION),
            _entity: PhantomData,
        })
    }
}

#[async_trait]
impl HealthCheckable for MemoryContext {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            store_id: "memory".to_string(),
            status: StoreHealth::Healthy,
            latency_ms: 0,
            message: None,
            checked_at: Utc::now(),
        }
    }
}

/// One in-memory collection of `T`
pub struct MemoryCollection<T> {
    documents: SharedDocuments,
    _entity: PhantomData<fn() -> T>,
}

fn contains_id(documents: &[Document], id: &serde_json::Value) -> bool {
    documents.iter().any(|d| json_eq(&d.id, id))
}

#[async_trait]
impl<T: Entity> DocumentCollection<T> for MemoryCollection<T> {
    fn name(&self) -> &str {
        T::COLLECTION
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    async fn insert_one(&self, entity: &T) -> StoreResult<()> {
        let document = Document::from_entity(entity)?;
        let mut documents = self.documents.write().await;

        if contains_id(&documents, &document.id) {
            return Err(StoreError::duplicate_key(T::COLLECTION, entity.id()));
        }
        documents.push(document);
        Ok(())
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION, count = entities.len()))]
    async fn insert_many(&self, entities: &[T]) -> StoreResult<()> {
        let batch = entities
            .iter()
            .map(Document::from_entity)
            .collect::<StoreResult<Vec<_>>>()?;
        let mut documents = self.documents.write().await;

        // Ids of one entity type serialise canonically, so the text form is a key
        let mut seen: HashSet<String> = documents.iter().map(|d| d.id.to_string()).collect();
        for (document, entity) in batch.iter().zip(entities) {
            if !seen.insert(document.id.to_string()) {
                return Err(StoreError::duplicate_key(T::COLLECTION, entity.id()));
            }
        }
        documents.extend(batch);
        Ok(())
    }

    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        let documents = self.documents.read().await;
        Ok(documents.iter().filter(|d| filter.matches(&d.body)).count() as u64)
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    async fn delete_one(&self, filter: &Filter) -> StoreResult<u64> {
        let mut documents = self.documents.write().await;
        match documents.iter().position(|d| filter.matches(&d.body)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> StoreResult<Vec<T>> {
        let mut matched: Vec<serde_json::Value> = {
            let documents = self.documents.read().await;
            documents
                .iter()
                .filter(|d| filter.matches(&d.body))
                .map(|d| d.body.clone())
                .collect()
        };

        if let Some(sort) = &options.sort {
            matched.sort_by(|a, b| sort.compare(a, b));
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(core_kernel::entity::decode_body)
            .collect()
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<T>> {
        let body = {
            let documents = self.documents.read().await;
            documents
                .iter()
                .find(|d| filter.matches(&d.body))
                .map(|d| d.body.clone())
        };

        body.map(core_kernel::entity::decode_body).transpose()
    }

    async fn find_by_id(&self, id: &serde_json::Value) -> StoreResult<Option<T>> {
        let body = {
            let documents = self.documents.read().await;
            documents
                .iter()
                .find(|d| json_eq(&d.id, id))
                .map(|d| d.body.clone())
        };

        body.map(core_kernel::entity::decode_body).transpose()
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    async fn delete_by_id(&self, id: &serde_json::Value) -> StoreResult<u64> {
        let mut documents = self.documents.write().await;
        match documents.iter().position(|d| json_eq(&d.id, id)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    async fn replace_one(&self, entity: &T) -> StoreResult<u64> {
        let replacement = Document::from_entity(entity)?;
        let mut documents = self.documents.write().await;

        let Some(stored) = documents.iter_mut().find(|d| json_eq(&d.id, &replacement.id)) else {
            return Ok(0);
        };
        if json_eq(&stored.body, &replacement.body) {
            return Ok(0);
        }
        stored.body = replacement.body;
        Ok(1)
    }
}
