//! Generic repository over a document collection
//!
//! `Repository<T>` maps CRUD and paged queries for one entity type onto the
//! collection handle it acquires at construction. Every operation takes a
//! [`CancellationToken`]: the token is checked before the store is called and
//! raced against the store call, and a cancelled operation fails with
//! `StoreError::Cancelled` instead of returning a result.
//!
//! Store errors are passed through untouched. The repository never retries.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{MemoryContext, Repository};
//! use core_kernel::{Filter, PageRequest, SortSpec};
//! use tokio_util::sync::CancellationToken;
//!
//! let context = MemoryContext::new();
//! let articles: Repository<Article> = Repository::new(&context);
//! let cancel = CancellationToken::new();
//!
//! articles.add(article, &cancel).await?;
//! let top = articles
//!     .get_paged(PageRequest::new(1, 10), SortSpec::descending("rank"), None, &cancel)
//!     .await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use core_kernel::entity::id_value;
use core_kernel::{
    CollectionContext, DocumentCollection, Entity, Filter, FindOptions, PageRequest, SortSpec,
    StoreError, StoreResult,
};

/// Runs a store call unless the token is, or becomes, cancelled
pub(crate) async fn cancellable<R>(
    operation: &'static str,
    cancel: &CancellationToken,
    call: impl Future<Output = StoreResult<R>>,
) -> StoreResult<R> {
    if cancel.is_cancelled() {
        debug!(operation, "Cancelled before store call");
        return Err(StoreError::cancelled(operation));
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(operation, "Cancelled during store call");
            Err(StoreError::cancelled(operation))
        }
        result = call => result,
    }
}

/// Data-access facade for one entity type
pub struct Repository<T: Entity> {
    collection: Arc<dyn DocumentCollection<T>>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
        }
    }
}

impl<T: Entity> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("collection", &self.collection.name())
            .finish()
    }
}

impl<T: Entity> Repository<T> {
    /// Creates a repository, acquiring the collection handle from `context`
    pub fn new<C: CollectionContext>(context: &C) -> Self {
        Self::from_collection(context.collection::<T>())
    }

    /// Creates a repository over an already acquired collection handle
    pub fn from_collection(collection: Arc<dyn DocumentCollection<T>>) -> Self {
        Self { collection }
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    /// Inserts an entity and hands it back
    ///
    /// # Errors
    ///
    /// A duplicate identifier or any other rejected insert surfaces as
    /// `StoreError::Write`.
    #[instrument(skip_all, fields(collection = T::COLLECTION, id = %entity.id()))]
    pub async fn add(&self, entity: T, cancel: &CancellationToken) -> StoreResult<T> {
        cancellable("add", cancel, self.collection.insert_one(&entity)).await?;
        debug!("Inserted entity");
        Ok(entity)
    }

    /// Inserts all entities or none; returns how many were submitted
    #[instrument(skip_all, fields(collection = T::COLLECTION, count = entities.len()))]
    pub async fn add_many(&self, entities: &[T], cancel: &CancellationToken) -> StoreResult<usize> {
        if entities.is_empty() {
            return cancellable("add_many", cancel, async { Ok(0) }).await;
        }

        cancellable("add_many", cancel, self.collection.insert_many(entities)).await?;
        debug!("Inserted entities");
        Ok(entities.len())
    }

    /// Counts entities matching the filter
    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    pub async fn count(&self, filter: &Filter, cancel: &CancellationToken) -> StoreResult<u64> {
        cancellable("count", cancel, self.collection.count(filter)).await
    }

    /// Deletes the entity with this id; returns 0 or 1
    #[instrument(skip_all, fields(collection = T::COLLECTION, id = %id))]
    pub async fn delete(&self, id: &T::Id, cancel: &CancellationToken) -> StoreResult<u64> {
        let id = id_value::<T>(id)?;
        let deleted = cancellable("delete", cancel, self.collection.delete_by_id(&id)).await?;
        debug!(deleted, "Deleted by id");
        Ok(deleted)
    }

    /// Deletes at most one entity matching the filter
    ///
    /// This is a single-document delete even when several entities match.
    /// Callers that want every match removed must loop until it returns 0.
    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    pub async fn delete_where(&self, filter: &Filter, cancel: &CancellationToken) -> StoreResult<u64> {
        let deleted =
            cancellable("delete_where", cancel, self.collection.delete_one(filter)).await?;
        debug!(deleted, "Deleted by filter");
        Ok(deleted)
    }

    /// Returns a lazy, restartable listing of the whole collection
    ///
    /// No query runs until the listing is loaded, and every load reads the
    /// current contents of the collection. The listing is unbounded.
    pub async fn get_list(&self, cancel: &CancellationToken) -> StoreResult<EntityList<T>> {
        cancellable("get_list", cancel, async {
            Ok(EntityList::new(Arc::clone(&self.collection), Filter::All))
        })
        .await
    }

    /// Returns every entity matching the filter, materialised in memory
    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    pub async fn get_list_where(
        &self,
        filter: &Filter,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<T>> {
        let options = FindOptions::default();
        let entities =
            cancellable("get_list_where", cancel, self.collection.find(filter, &options)).await?;
        debug!(returned = entities.len(), "Listed entities");
        Ok(entities)
    }

    /// Looks up an entity by id; `None` when absent
    #[instrument(skip_all, fields(collection = T::COLLECTION, id = %id))]
    pub async fn get_model(&self, id: &T::Id, cancel: &CancellationToken) -> StoreResult<Option<T>> {
        let id = id_value::<T>(id)?;
        cancellable("get_model", cancel, self.collection.find_by_id(&id)).await
    }

    /// Returns the first entity matching the filter; `None` when absent
    ///
    /// No tie-break is promised when several entities match. Callers that
    /// need a specific one must make the filter unique.
    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    pub async fn get_model_where(
        &self,
        filter: &Filter,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<T>> {
        cancellable("get_model_where", cancel, self.collection.find_one(filter)).await
    }

    /// Returns one sorted page of entities matching `filter` (all when `None`)
    #[instrument(
        skip_all,
        fields(
            collection = T::COLLECTION,
            page_index = page.page_index,
            page_size = page.page_size,
            sort = %sort.field,
        )
    )]
    pub async fn get_paged(
        &self,
        page: PageRequest,
        sort: SortSpec,
        filter: Option<&Filter>,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<T>> {
        let all = Filter::All;
        let filter = filter.unwrap_or(&all);
        let options = FindOptions::page(page, sort);
        let entities =
            cancellable("get_paged", cancel, self.collection.find(filter, &options)).await?;
        debug!(returned = entities.len(), "Fetched page");
        Ok(entities)
    }

    /// Replaces the stored entity with the same id by `entity` in full
    ///
    /// Fields of the stored document that `entity` no longer carries are
    /// gone afterwards. Returns 1 if the stored document changed, otherwise 0.
    #[instrument(skip_all, fields(collection = T::COLLECTION, id = %entity.id()))]
    pub async fn update(&self, entity: &T, cancel: &CancellationToken) -> StoreResult<u64> {
        let modified = cancellable("update", cancel, self.collection.replace_one(entity)).await?;
        debug!(modified, "Replaced entity");
        Ok(modified)
    }

    /// Replaces each entity in turn; returns the sum of modified counts
    ///
    /// The replaces run sequentially with no transaction. If one fails, the
    /// earlier ones stay committed and the later ones are not attempted.
    #[instrument(skip_all, fields(collection = T::COLLECTION, count = entities.len()))]
    pub async fn update_many(&self, entities: &[T], cancel: &CancellationToken) -> StoreResult<u64> {
        let mut modified = 0;
        for entity in entities {
            modified +=
                cancellable("update_many", cancel, self.collection.replace_one(entity)).await?;
        }
        debug!(modified, "Replaced entities");
        Ok(modified)
    }
}

/// A deferred query over a collection
///
/// Loading runs the query; loading again runs it again.
pub struct EntityList<T: Entity> {
    collection: Arc<dyn DocumentCollection<T>>,
    filter: Filter,
}

impl<T: Entity> Clone for EntityList<T> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
            filter: self.filter.clone(),
        }
    }
}

impl<T: Entity> std::fmt::Debug for EntityList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityList")
            .field("collection", &self.collection.name())
            .field("filter", &self.filter)
            .finish()
    }
}

impl<T: Entity> EntityList<T> {
    fn new(collection: Arc<dyn DocumentCollection<T>>, filter: Filter) -> Self {
        Self { collection, filter }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Narrows the listing with an additional filter
    pub fn refine(self, filter: Filter) -> Self {
        Self {
            collection: self.collection,
            filter: self.filter.and(filter),
        }
    }

    /// Runs the query and returns every entity in natural order
    pub async fn load(&self, cancel: &CancellationToken) -> StoreResult<Vec<T>> {
        let options = FindOptions::default();
        cancellable("load", cancel, self.collection.find(&self.filter, &options)).await
    }

    /// Counts the entities the listing would return
    pub async fn count(&self, cancel: &CancellationToken) -> StoreResult<u64> {
        cancellable("count", cancel, self.collection.count(&self.filter)).await
    }
}
