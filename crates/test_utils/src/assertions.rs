//! Custom Test Assertions
//!
//! Assertion helpers for store results that give more meaningful failure
//! messages than a bare `assert!`.

use core_kernel::{SortDirection, StoreError, StoreResult};
use std::fmt::Debug;

use crate::fixtures::Article;

/// Asserts that an operation failed because it was cancelled
pub fn assert_cancelled<T: Debug>(result: &StoreResult<T>) {
    match result {
        Err(StoreError::Cancelled { .. }) => {}
        other => panic!("Expected a cancelled operation, got {:?}", other),
    }
}

/// Asserts that articles are ordered by rank in the given direction
pub fn assert_ranks_sorted(articles: &[Article], direction: SortDirection) {
    let ranks: Vec<i64> = articles.iter().map(|a| a.rank).collect();
    let sorted = ranks.windows(2).all(|pair| match direction {
        SortDirection::Ascending => pair[0] <= pair[1],
        SortDirection::Descending => pair[0] >= pair[1],
    });
    assert!(sorted, "Ranks not sorted {:?}: {:?}", direction, ranks);
}

/// Asserts that two article sets hold the same ids, ignoring order
pub fn assert_same_ids(actual: &[Article], expected: &[Article]) {
    let mut actual_ids: Vec<i64> = actual.iter().map(|a| a.id).collect();
    let mut expected_ids: Vec<i64> = expected.iter().map(|a| a.id).collect();
    actual_ids.sort_unstable();
    expected_ids.sort_unstable();
    assert_eq!(actual_ids, expected_ids, "Article ids differ");
}
