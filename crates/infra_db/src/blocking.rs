//! Synchronous form of the repository
//!
//! `BlockingRepository<T>` drives the async [`Repository`] to completion on a
//! runtime it shares ownership of, so each operation has the same semantics
//! as its async counterpart without a cancellation token.
//!
//! # Panics
//!
//! Every operation blocks the calling thread and panics if called from
//! inside an async execution context.

use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use core_kernel::{CollectionContext, Entity, Filter, PageRequest, SortSpec, StoreResult};

use crate::repository::{EntityList, Repository};

/// Blocking data-access facade for one entity type
pub struct BlockingRepository<T: Entity> {
    inner: Repository<T>,
    runtime: Arc<Runtime>,
}

impl<T: Entity> Clone for BlockingRepository<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            runtime: Arc::clone(&self.runtime),
        }
    }
}

impl<T: Entity> BlockingRepository<T> {
    pub fn new(inner: Repository<T>, runtime: Arc<Runtime>) -> Self {
        Self { inner, runtime }
    }

    /// Acquires the collection handle from `context`
    pub fn with_context<C: CollectionContext>(context: &C, runtime: Arc<Runtime>) -> Self {
        Self::new(Repository::new(context), runtime)
    }

    /// The async repository this wraps
    pub fn inner(&self) -> &Repository<T> {
        &self.inner
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn add(&self, entity: T) -> StoreResult<T> {
        self.block_on(self.inner.add(entity, &CancellationToken::new()))
    }

    pub fn add_many(&self, entities: &[T]) -> StoreResult<usize> {
        self.block_on(self.inner.add_many(entities, &CancellationToken::new()))
    }

    pub fn count(&self, filter: &Filter) -> StoreResult<u64> {
        self.block_on(self.inner.count(filter, &CancellationToken::new()))
    }

    pub fn delete(&self, id: &T::Id) -> StoreResult<u64> {
        self.block_on(self.inner.delete(id, &CancellationToken::new()))
    }

    pub fn delete_where(&self, filter: &Filter) -> StoreResult<u64> {
        self.block_on(self.inner.delete_where(filter, &CancellationToken::new()))
    }

    pub fn get_list(&self) -> StoreResult<BlockingEntityList<T>> {
        let list = self.block_on(self.inner.get_list(&CancellationToken::new()))?;
        Ok(BlockingEntityList {
            inner: list,
            runtime: Arc::clone(&self.runtime),
        })
    }

    pub fn get_list_where(&self, filter: &Filter) -> StoreResult<Vec<T>> {
        self.block_on(self.inner.get_list_where(filter, &CancellationToken::new()))
    }

    pub fn get_model(&self, id: &T::Id) -> StoreResult<Option<T>> {
        self.block_on(self.inner.get_model(id, &CancellationToken::new()))
    }

    pub fn get_model_where(&self, filter: &Filter) -> StoreResult<Option<T>> {
        self.block_on(self.inner.get_model_where(filter, &CancellationToken::new()))
    }

    pub fn get_paged(
        &self,
        page: PageRequest,
        sort: SortSpec,
        filter: Option<&Filter>,
    ) -> StoreResult<Vec<T>> {
        self.block_on(
            self.inner
                .get_paged(page, sort, filter, &CancellationToken::new()),
        )
    }

    pub fn update(&self, entity: &T) -> StoreResult<u64> {
        self.block_on(self.inner.update(entity, &CancellationToken::new()))
    }

    pub fn update_many(&self, entities: &[T]) -> StoreResult<u64> {
        self.block_on(self.inner.update_many(entities, &CancellationToken::new()))
    }
}

/// Blocking counterpart of [`EntityList`]
pub struct BlockingEntityList<T: Entity> {
    inner: EntityList<T>,
    runtime: Arc<Runtime>,
}

impl<T: Entity> std::fmt::Debug for BlockingEntityList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

impl<T: Entity> BlockingEntityList<T> {
    pub fn filter(&self) -> &Filter {
        self.inner.filter()
    }

    pub fn refine(self, filter: Filter) -> Self {
        Self {
            inner: self.inner.refine(filter),
            runtime: self.runtime,
        }
    }

    pub fn load(&self) -> StoreResult<Vec<T>> {
        self.runtime
            .block_on(self.inner.load(&CancellationToken::new()))
    }

    pub fn count(&self) -> StoreResult<u64> {
        self.runtime
            .block_on(self.inner.count(&CancellationToken::new()))
    }
}

impl<T: Entity> IntoIterator for &BlockingEntityList<T> {
    type Item = StoreResult<T>;
    type IntoIter = std::vec::IntoIter<StoreResult<T>>;

    /// Loads the listing; a failed load yields a single error item
    fn into_iter(self) -> Self::IntoIter {
        match self.load() {
            Ok(entities) => entities.into_iter().map(Ok).collect::<Vec<_>>().into_iter(),
            Err(error) => vec![Err(error)].into_iter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryContext;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: u32,
        text: String,
    }

    impl Entity for Note {
        type Id = u32;
        const COLLECTION: &'static str = "notes";

        fn id(&self) -> &u32 {
            &self.id
        }
    }

    fn note(id: u32, text: &str) -> Note {
        Note {
            id,
            text: text.to_string(),
        }
    }

    fn repository() -> BlockingRepository<Note> {
        let runtime = Arc::new(Runtime::new().unwrap());
        BlockingRepository::with_context(&MemoryContext::new(), runtime)
    }

    #[test]
    fn test_blocking_add_and_get() {
        let notes = repository();
        notes.add(note(1, "first")).unwrap();

        assert_eq!(notes.get_model(&1).unwrap(), Some(note(1, "first")));
        assert_eq!(notes.get_model(&2).unwrap(), None);
    }

    #[test]
    fn test_blocking_list_is_restartable() {
        let notes = repository();
        let list = notes.get_list().unwrap();
        assert!(list.load().unwrap().is_empty());

        notes.add_many(&[note(1, "a"), note(2, "b")]).unwrap();
        assert_eq!(list.count().unwrap(), 2);

        let texts: Vec<String> = (&list)
            .into_iter()
            .map(|n| n.unwrap().text)
            .collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_clones_share_runtime_and_collection() {
        let notes = repository();
        let other = notes.clone();
        other.add(note(7, "shared")).unwrap();

        assert_eq!(notes.count(&Filter::All).unwrap(), 1);
        assert_eq!(notes.inner().collection_name(), "notes");
    }
}
