//! Pre-built Test Fixtures
//!
//! `Article` is the entity used throughout the repository tests. Its shape
//! covers the cases the stores must handle: a numeric id, a sortable rank,
//! an array field, an optional field and a timestamp.

use chrono::{DateTime, TimeZone, Utc};
use core_kernel::Entity;
use serde::{Deserialize, Serialize};

/// Test entity stored in the `articles` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub rank: i64,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl Entity for Article {
    type Id = i64;
    const COLLECTION: &'static str = "articles";

    fn id(&self) -> &i64 {
        &self.id
    }
}

core_kernel::define_id!(AuthorId, "AUT");

/// Test entity with a typed UUID identifier, stored in `authors`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
}

impl Entity for Author {
    type Id = AuthorId;
    const COLLECTION: &'static str = "authors";

    fn id(&self) -> &AuthorId {
        &self.id
    }
}

pub fn author(name: &str) -> Author {
    Author {
        id: AuthorId::new_v7(),
        name: name.to_string(),
    }
}

/// Fixed publication date (Jan 1, 2024)
pub fn publication_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Creates an article with predictable content
pub fn article(id: i64, rank: i64) -> Article {
    Article {
        id,
        title: format!("Article {}", id),
        rank,
        tags: Vec::new(),
        summary: None,
        published_at: publication_date(),
    }
}

/// Articles with ids 1..=count where the rank equals the id
pub fn ranked_articles(count: i64) -> Vec<Article> {
    (1..=count).map(|id| article(id, id)).collect()
}

/// Ids of the given articles, in order
pub fn ids(articles: &[Article]) -> Vec<i64> {
    articles.iter().map(|a| a.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_articles_share_id_and_rank() {
        let articles = ranked_articles(3);
        assert_eq!(ids(&articles), vec![1, 2, 3]);
        assert!(articles.iter().all(|a| a.id == a.rank));
    }

    #[test]
    fn test_typed_author_id_is_stored_as_bare_uuid() {
        let entity = author("ada");
        let document = core_kernel::Document::from_entity(&entity).unwrap();

        assert_eq!(document.id, serde_json::json!(entity.id.as_uuid().to_string()));
        assert_eq!(document.to_entity::<Author>().unwrap(), entity);
        assert!(entity.id.to_string().starts_with("AUT-"));
    }

    #[test]
    fn test_absent_summary_is_not_serialised() {
        let body = serde_json::to_value(article(1, 1)).unwrap();
        assert!(body.get("summary").is_none());
        assert_eq!(body["id"], 1);
    }
}
