//! Test Data Builders
//!
//! Provides a builder for articles. Fields a test does not set are filled
//! with faked content, so only the fields under test need to be spelled out.

use chrono::{DateTime, Utc};
use fake::faker::lorem::en::{Sentence, Words};
use fake::Fake;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::fixtures::{publication_date, Article};

static NEXT_ID: AtomicI64 = AtomicI64::new(1_000_000);

/// Builder for constructing test articles
pub struct ArticleBuilder {
    id: i64,
    title: String,
    rank: i64,
    tags: Vec<String>,
    summary: Option<String>,
    published_at: DateTime<Utc>,
}

impl Default for ArticleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArticleBuilder {
    /// Creates a builder with a process-unique id and faked text
    pub fn new() -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            title: Sentence(2..6).fake(),
            rank: (0i64..100).fake(),
            tags: Words(0..4).fake(),
            summary: None,
            published_at: publication_date(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_rank(mut self, rank: i64) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = at;
        self
    }

    pub fn build(self) -> Article {
        Article {
            id: self.id,
            title: self.title,
            rank: self.rank,
            tags: self.tags,
            summary: self.summary,
            published_at: self.published_at,
        }
    }
}
