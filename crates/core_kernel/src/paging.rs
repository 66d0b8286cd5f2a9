//! Sort and paging descriptors
//!
//! Page indexes are 1-based. The skip offset is `(page_index - 1) * page_size`;
//! a page index of zero is a caller error and is not validated, the offset
//! simply saturates at zero.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::filter::{compare_json, FieldPath};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Maps the `is_desc` flag used by callers to a direction
    pub fn from_descending(descending: bool) -> Self {
        if descending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        }
    }

    pub fn is_descending(&self) -> bool {
        matches!(self, SortDirection::Descending)
    }
}

/// Sort key: a document field and a direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: FieldPath,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<FieldPath>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn ascending(field: impl Into<FieldPath>) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    pub fn descending(field: impl Into<FieldPath>) -> Self {
        Self::new(field, SortDirection::Descending)
    }

    /// Orders two documents by the sort field
    ///
    /// A missing field sorts after every value when ascending and before
    /// every value when descending. Equal keys compare as `Equal`, so a stable
    /// sort keeps the natural order of ties.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ordering = match (self.field.resolve(a), self.field.resolve(b)) {
            (Some(a), Some(b)) => compare_json(a, b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };

        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// A 1-based page window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_index: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page_index: u32, page_size: u32) -> Self {
        Self {
            page_index,
            page_size,
        }
    }

    /// Number of matching documents to skip
    pub fn skip(&self) -> u64 {
        u64::from(self.page_index.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// Maximum number of documents in the page
    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

/// Options handed from the repository to a collection for a find
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Option<SortSpec>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    /// Options for a sorted page window
    pub fn page(page: PageRequest, sort: SortSpec) -> Self {
        Self {
            sort: Some(sort),
            skip: page.skip(),
            limit: Some(page.limit()),
        }
    }
}
