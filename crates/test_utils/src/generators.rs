//! Property-Based Test Generators
//!
//! Provides proptest strategies for articles. Generated sets always carry
//! distinct ids so they can be inserted as a batch.

use core_kernel::{SortDirection, SortSpec};
use proptest::collection::{hash_set, vec};
use proptest::prelude::*;

use crate::fixtures::{publication_date, Article};

/// Strategy for article ranks; a narrow range produces ties
pub fn rank_strategy() -> impl Strategy<Value = i64> {
    -5i64..20i64
}

/// Strategy for a single article with the given id
pub fn article_with_id_strategy(id: i64) -> impl Strategy<Value = Article> {
    (
        "[a-z]{1,12}",
        rank_strategy(),
        vec("[a-z]{2,6}", 0..3),
        proptest::option::of("[a-z ]{0,20}"),
    )
        .prop_map(move |(title, rank, tags, summary)| Article {
            id,
            title,
            rank,
            tags,
            summary,
            published_at: publication_date(),
        })
}

/// Strategy for up to `max` articles with distinct ids
pub fn articles_strategy(max: usize) -> impl Strategy<Value = Vec<Article>> {
    hash_set(0i64..10_000, 0..=max).prop_flat_map(|ids| {
        ids.into_iter()
            .map(article_with_id_strategy)
            .collect::<Vec<_>>()
    })
}

/// Strategy for a sort on one of the article fields
pub fn sort_strategy() -> impl Strategy<Value = SortSpec> {
    (
        prop_oneof![Just("rank"), Just("title"), Just("id"), Just("summary")],
        any::<bool>(),
    )
        .prop_map(|(field, descending)| {
            SortSpec::new(field, SortDirection::from_descending(descending))
        })
}
