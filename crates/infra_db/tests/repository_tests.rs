//! Repository tests against the in-memory store

use std::sync::Arc;
use std::time::{Duration, Instant};

use core_kernel::{CollectionContext, Filter, PageRequest, SortDirection, SortSpec};
use infra_db::{CancellationToken, MemoryContext, Repository};
use test_utils::{
    article, assert_cancelled, assert_ranks_sorted, author, ids, init_test_tracing,
    ranked_articles, Article, ArticleBuilder, Author, AuthorId, FaultyCollection,
};

fn repository() -> Repository<Article> {
    init_test_tracing();
    Repository::new(&MemoryContext::new())
}

/// Ids 1..=10 with rank 10..=1
fn reverse_ranked() -> Vec<Article> {
    (1..=10).map(|id| article(id, 11 - id)).collect()
}

// ============================================================================
// Add Tests
// ============================================================================

mod add_tests {
    use super::*;

    #[tokio::test]
    async fn test_add_then_get_model_returns_equal_entity() {
        let repo = repository();
        let cancel = CancellationToken::new();
        let entity = ArticleBuilder::new()
            .with_tags(["storage"])
            .with_summary("about documents")
            .build();

        let returned = repo.add(entity.clone(), &cancel).await.unwrap();
        assert_eq!(returned, entity);

        let found = repo.get_model(&entity.id, &cancel).await.unwrap();
        assert_eq!(found, Some(entity));
    }

    #[tokio::test]
    async fn test_add_duplicate_id_is_write_error() {
        let repo = repository();
        let cancel = CancellationToken::new();
        repo.add(article(1, 1), &cancel).await.unwrap();

        let error = repo.add(article(1, 2), &cancel).await.unwrap_err();
        assert!(error.is_write());
        assert!(error.is_duplicate_key());
        assert_eq!(repo.count(&Filter::All, &cancel).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_many_is_all_or_nothing() {
        let repo = repository();
        let cancel = CancellationToken::new();
        repo.add(article(2, 2), &cancel).await.unwrap();

        let error = repo
            .add_many(&ranked_articles(3), &cancel)
            .await
            .unwrap_err();
        assert!(error.is_duplicate_key());
        assert_eq!(repo.count(&Filter::All, &cancel).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_typed_uuid_ids_round_trip() {
        init_test_tracing();
        let repo: Repository<Author> = Repository::new(&MemoryContext::new());
        let cancel = CancellationToken::new();
        let ada = author("ada");
        repo.add_many(&[ada.clone(), author("grace")], &cancel)
            .await
            .unwrap();

        assert_eq!(repo.get_model(&ada.id, &cancel).await.unwrap(), Some(ada.clone()));
        assert_eq!(repo.get_model(&AuthorId::new(), &cancel).await.unwrap(), None);
        assert_eq!(repo.delete(&ada.id, &cancel).await.unwrap(), 1);
        assert_eq!(repo.count(&Filter::All, &cancel).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_many_returns_inserted_count() {
        let repo = repository();
        let cancel = CancellationToken::new();

        assert_eq!(repo.add_many(&ranked_articles(4), &cancel).await.unwrap(), 4);
        assert_eq!(repo.count(&Filter::All, &cancel).await.unwrap(), 4);
    }
}

// ============================================================================
// Count and Delete Tests
// ============================================================================

mod delete_tests {
    use super::*;

    #[tokio::test]
    async fn test_count_with_filter() {
        let repo = repository();
        let cancel = CancellationToken::new();
        repo.add_many(&ranked_articles(10), &cancel).await.unwrap();

        assert_eq!(repo.count(&Filter::gt("rank", 7), &cancel).await.unwrap(), 3);
        assert_eq!(repo.count(&Filter::eq("rank", 99), &cancel).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let repo = repository();
        let cancel = CancellationToken::new();
        repo.add_many(&ranked_articles(2), &cancel).await.unwrap();

        assert_eq!(repo.delete(&1, &cancel).await.unwrap(), 1);
        assert_eq!(repo.get_model(&1, &cancel).await.unwrap(), None);
        assert_eq!(repo.delete(&1, &cancel).await.unwrap(), 0);
        assert_eq!(repo.count(&Filter::All, &cancel).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_where_removes_only_first_match() {
        let repo = repository();
        let cancel = CancellationToken::new();
        let same_rank: Vec<Article> = (1..=5).map(|id| article(id, 1)).collect();
        repo.add_many(&same_rank, &cancel).await.unwrap();

        let deleted = repo.delete_where(&Filter::eq("rank", 1), &cancel).await.unwrap();
        assert_eq!(deleted, 1);

        let remaining = repo.get_list_where(&Filter::All, &cancel).await.unwrap();
        assert_eq!(ids(&remaining), vec![2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_delete_where_without_match() {
        let repo = repository();
        let cancel = CancellationToken::new();
        repo.add_many(&ranked_articles(3), &cancel).await.unwrap();

        assert_eq!(repo.delete_where(&Filter::gt("rank", 3), &cancel).await.unwrap(), 0);
        assert_eq!(repo.count(&Filter::All, &cancel).await.unwrap(), 3);
    }
}

// ============================================================================
// Listing and Lookup Tests
// ============================================================================

mod list_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_list_is_lazy_and_restartable() {
        let repo = repository();
        let cancel = CancellationToken::new();
        let list = repo.get_list(&cancel).await.unwrap();

        repo.add_many(&ranked_articles(3), &cancel).await.unwrap();
        let first = list.load(&cancel).await.unwrap();
        assert_eq!(ids(&first), vec![1, 2, 3]);

        repo.add(article(4, 4), &cancel).await.unwrap();
        let second = list.load(&cancel).await.unwrap();
        assert_eq!(ids(&second), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_get_list_with_cancelled_token() {
        let repo = repository();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_cancelled(&repo.get_list(&cancel).await);
    }

    #[tokio::test]
    async fn test_get_list_where_materialises_matches() {
        let repo = repository();
        let cancel = CancellationToken::new();
        repo.add_many(&ranked_articles(6), &cancel).await.unwrap();

        let even = repo
            .get_list_where(&Filter::is_in("rank", [2, 4, 6]), &cancel)
            .await
            .unwrap();
        assert_eq!(ids(&even), vec![2, 4, 6]);
    }

    #[tokio::test]
    async fn test_get_model_absent_is_none() {
        let repo = repository();
        let cancel = CancellationToken::new();

        assert_eq!(repo.get_model(&42, &cancel).await.unwrap(), None);
        assert_eq!(
            repo.get_model_where(&Filter::eq("title", "missing"), &cancel)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_get_model_where_unique_filter() {
        let repo = repository();
        let cancel = CancellationToken::new();
        repo.add_many(&ranked_articles(5), &cancel).await.unwrap();

        let found = repo
            .get_model_where(&Filter::eq("title", "Article 3"), &cancel)
            .await
            .unwrap();
        assert_eq!(found.map(|a| a.id), Some(3));
    }

    #[tokio::test]
    async fn test_filter_on_array_element() {
        let repo = repository();
        let cancel = CancellationToken::new();
        repo.add_many(
            &[
                ArticleBuilder::new().with_id(1).with_tags(["rust", "db"]).build(),
                ArticleBuilder::new().with_id(2).with_tags(["go"]).build(),
            ],
            &cancel,
        )
        .await
        .unwrap();

        let found = repo
            .get_list_where(&Filter::eq("tags.0", "rust"), &cancel)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec![1]);
    }
}

// ============================================================================
// Paging Tests
// ============================================================================

mod paging_tests {
    use super::*;

    #[tokio::test]
    async fn test_first_page_ascending_by_rank() {
        let repo = repository();
        let cancel = CancellationToken::new();
        repo.add_many(&reverse_ranked(), &cancel).await.unwrap();

        let page = repo
            .get_paged(PageRequest::new(1, 3), SortSpec::ascending("rank"), None, &cancel)
            .await
            .unwrap();

        assert_eq!(page.iter().map(|a| a.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(ids(&page), vec![10, 9, 8]);
    }

    #[tokio::test]
    async fn test_consecutive_pages_have_no_overlap_or_gap() {
        let repo = repository();
        let cancel = CancellationToken::new();
        repo.add_many(&reverse_ranked(), &cancel).await.unwrap();
        let sort = SortSpec::ascending("rank");

        let first = repo
            .get_paged(PageRequest::new(1, 4), sort.clone(), None, &cancel)
            .await
            .unwrap();
        let second = repo
            .get_paged(PageRequest::new(2, 4), sort.clone(), None, &cancel)
            .await
            .unwrap();
        let third = repo
            .get_paged(PageRequest::new(3, 4), sort, None, &cancel)
            .await
            .unwrap();

        assert_eq!(ids(&first), vec![10, 9, 8, 7]);
        assert_eq!(ids(&second), vec![6, 5, 4, 3]);
        assert_eq!(ids(&third), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_descending_page_with_filter() {
        let repo = repository();
        let cancel = CancellationToken::new();
        repo.add_many(&ranked_articles(10), &cancel).await.unwrap();

        let filter = Filter::lte("rank", 6);
        let page = repo
            .get_paged(
                PageRequest::new(1, 3),
                SortSpec::descending("rank"),
                Some(&filter),
                &cancel,
            )
            .await
            .unwrap();

        assert_ranks_sorted(&page, SortDirection::Descending);
        assert_eq!(ids(&page), vec![6, 5, 4]);
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_empty() {
        let repo = repository();
        let cancel = CancellationToken::new();
        repo.add_many(&ranked_articles(3), &cancel).await.unwrap();

        let page = repo
            .get_paged(PageRequest::new(5, 3), SortSpec::ascending("rank"), None, &cancel)
            .await
            .unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let repo = repository();
        let cancel = CancellationToken::new();
        let tied = vec![article(3, 1), article(1, 1), article(2, 0)];
        repo.add_many(&tied, &cancel).await.unwrap();

        let page = repo
            .get_paged(PageRequest::new(1, 10), SortSpec::ascending("rank"), None, &cancel)
            .await
            .unwrap();
        assert_eq!(ids(&page), vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_missing_sort_field_sorts_last_ascending() {
        let repo = repository();
        let cancel = CancellationToken::new();
        repo.add_many(
            &[
                ArticleBuilder::new().with_id(1).build(),
                ArticleBuilder::new().with_id(2).with_summary("b").build(),
                ArticleBuilder::new().with_id(3).with_summary("a").build(),
            ],
            &cancel,
        )
        .await
        .unwrap();

        let ascending = repo
            .get_paged(PageRequest::new(1, 3), SortSpec::ascending("summary"), None, &cancel)
            .await
            .unwrap();
        assert_eq!(ids(&ascending), vec![3, 2, 1]);

        let descending = repo
            .get_paged(PageRequest::new(1, 3), SortSpec::descending("summary"), None, &cancel)
            .await
            .unwrap();
        assert_eq!(ids(&descending), vec![1, 2, 3]);
    }
}

// ============================================================================
// Update Tests
// ============================================================================

mod update_tests {
    use super::*;

    #[tokio::test]
    async fn test_update_is_full_replace() {
        let repo = repository();
        let cancel = CancellationToken::new();
        let original = ArticleBuilder::new()
            .with_id(1)
            .with_summary("to be removed")
            .build();
        repo.add(original.clone(), &cancel).await.unwrap();

        let replacement = Article {
            summary: None,
            rank: original.rank + 1,
            ..original
        };
        assert_eq!(repo.update(&replacement, &cancel).await.unwrap(), 1);

        assert_eq!(repo.get_model(&1, &cancel).await.unwrap(), Some(replacement));
        assert_eq!(
            repo.count(&Filter::exists("summary"), &cancel).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_update_unknown_or_unchanged_reports_zero() {
        let repo = repository();
        let cancel = CancellationToken::new();
        repo.add(article(1, 1), &cancel).await.unwrap();

        assert_eq!(repo.update(&article(1, 1), &cancel).await.unwrap(), 0);
        assert_eq!(repo.update(&article(2, 1), &cancel).await.unwrap(), 0);
        assert_eq!(repo.count(&Filter::All, &cancel).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_many_sums_modified_counts() {
        let repo = repository();
        let cancel = CancellationToken::new();
        repo.add_many(&ranked_articles(3), &cancel).await.unwrap();

        let changes = vec![article(1, 10), article(2, 2), article(3, 30), article(4, 40)];
        assert_eq!(repo.update_many(&changes, &cancel).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_many_stops_at_first_failure() {
        init_test_tracing();
        let context = MemoryContext::new();
        let faulty = Arc::new(
            FaultyCollection::new(context.collection::<Article>()).failing_replace_at(2),
        );
        let repo: Repository<Article> = Repository::from_collection(faulty.clone());
        let cancel = CancellationToken::new();
        repo.add_many(&ranked_articles(5), &cancel).await.unwrap();

        let changes: Vec<Article> = (1..=5).map(|id| article(id, id * 100)).collect();
        let error = repo.update_many(&changes, &cancel).await.unwrap_err();
        assert!(error.is_connectivity());
        assert_eq!(faulty.replace_attempts(), 3);

        let stored = repo.get_list_where(&Filter::All, &cancel).await.unwrap();
        let ranks: Vec<i64> = stored.iter().map(|a| a.rank).collect();
        assert_eq!(ranks, vec![100, 200, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_update_many_with_cancelled_token_attempts_nothing() {
        let context = MemoryContext::new();
        let faulty = Arc::new(FaultyCollection::new(context.collection::<Article>()));
        let repo: Repository<Article> = Repository::from_collection(faulty.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_cancelled(&repo.update_many(&ranked_articles(2), &cancel).await);
        assert_eq!(faulty.replace_attempts(), 0);
    }
}

// ============================================================================
// Cancellation Tests
// ============================================================================

mod cancellation_tests {
    use super::*;

    #[tokio::test]
    async fn test_every_operation_observes_cancelled_token() {
        let repo = repository();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let sort = SortSpec::ascending("rank");

        assert_cancelled(&repo.add(article(1, 1), &cancel).await);
        assert_cancelled(&repo.add_many(&ranked_articles(2), &cancel).await);
        assert_cancelled(&repo.count(&Filter::All, &cancel).await);
        assert_cancelled(&repo.delete(&1, &cancel).await);
        assert_cancelled(&repo.delete_where(&Filter::All, &cancel).await);
        assert_cancelled(&repo.get_list_where(&Filter::All, &cancel).await);
        assert_cancelled(&repo.get_model(&1, &cancel).await);
        assert_cancelled(&repo.get_model_where(&Filter::All, &cancel).await);
        assert_cancelled(
            &repo
                .get_paged(PageRequest::new(1, 1), sort, None, &cancel)
                .await,
        );
        assert_cancelled(&repo.update(&article(1, 1), &cancel).await);

        let fresh = CancellationToken::new();
        assert_eq!(repo.count(&Filter::All, &fresh).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancelling_in_flight_call() {
        init_test_tracing();
        let context = MemoryContext::new();
        let slow = FaultyCollection::new(context.collection::<Article>())
            .with_latency(Duration::from_secs(30));
        let repo: Repository<Article> = Repository::from_collection(Arc::new(slow));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = repo.count(&Filter::All, &cancel).await;
        assert_cancelled(&result);
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_cancelled_listing_load() {
        let repo = repository();
        let list = repo.get_list(&CancellationToken::new()).await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_cancelled(&list.load(&cancel).await);
        assert_cancelled(&list.count(&cancel).await);
    }
}
