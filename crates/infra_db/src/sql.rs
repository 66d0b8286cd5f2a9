//! Translation of filters and find options into PostgreSQL
//!
//! Each collection is a table of JSONB documents:
//!
//! ```sql
//! CREATE TABLE "schema"."collection" (
//!     seq BIGSERIAL NOT NULL,      -- natural (insertion) order
//!     id  JSONB PRIMARY KEY,       -- serialised entity identifier
//!     doc JSONB NOT NULL           -- full serialised entity
//! );
//! ```
//!
//! Field paths and values are always bound as parameters (`text[]` and
//! `jsonb`); only validated identifiers are spliced into the statement text.
//! Every predicate is wrapped so it yields `TRUE` or `FALSE`, never `NULL`,
//! which keeps `NOT` consistent with the in-process evaluator.
//!
//! Strings compare using the database collation, which may differ from the
//! byte order used by the memory store. Negative path segments index from the
//! end of an array under `#>`, and the in-process evaluator resolves them the
//! same way.

use serde_json::Value;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};

use core_kernel::{FieldPath, Filter, FindOptions, SortDirection, StoreError};

const MAX_IDENTIFIER_LEN: usize = 63;

/// Validates a schema or collection name for use as a quoted identifier
pub fn validate_identifier(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && name.len() <= MAX_IDENTIFIER_LEN {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}

/// Returns `"schema"."collection"` after validating both parts
pub fn qualified_table(schema: &str, collection: &str) -> Result<String, StoreError> {
    validate_identifier(schema)?;
    validate_identifier(collection)?;
    Ok(format!("\"{}\".\"{}\"", schema, collection))
}

pub fn create_table_sql(table: &str, collection: &str) -> [String; 2] {
    [
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\
                seq BIGSERIAL NOT NULL, \
                id JSONB PRIMARY KEY, \
                doc JSONB NOT NULL)",
            table
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS \"{}_seq_idx\" ON {} (seq)",
            collection, table
        ),
    ]
}

fn push_path(builder: &mut QueryBuilder<'static, Postgres>, field: &FieldPath) {
    builder.push("(doc #> ");
    builder.push_bind(field.segments().to_vec());
    builder.push(")");
}

fn push_value(builder: &mut QueryBuilder<'static, Postgres>, value: &Value) {
    builder.push_bind(Json(value.clone()));
}

fn push_range(
    builder: &mut QueryBuilder<'static, Postgres>,
    field: &FieldPath,
    operator: &str,
    value: &Value,
) {
    builder.push("COALESCE(jsonb_typeof(");
    push_path(builder, field);
    builder.push(") = jsonb_typeof(");
    push_value(builder, value);
    builder.push(") AND ");
    push_path(builder, field);
    builder.push(format!(" {} ", operator));
    push_value(builder, value);
    builder.push(", FALSE)");
}

fn push_group(builder: &mut QueryBuilder<'static, Postgres>, filters: &[Filter], joiner: &str) {
    builder.push("(");
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            builder.push(joiner);
        }
        push_filter(builder, filter);
    }
    builder.push(")");
}

/// Appends a boolean SQL expression equivalent to `filter`
pub fn push_filter(builder: &mut QueryBuilder<'static, Postgres>, filter: &Filter) {
    match filter {
        Filter::All => {
            builder.push("TRUE");
        }
        Filter::Eq { field, value } => {
            builder.push("COALESCE(");
            push_path(builder, field);
            builder.push(" = ");
            push_value(builder, value);
            builder.push(", FALSE)");
        }
        Filter::Ne { field, value } => {
            builder.push("(");
            push_path(builder, field);
            builder.push(" IS DISTINCT FROM ");
            push_value(builder, value);
            builder.push(")");
        }
        Filter::Gt { field, value } => push_range(builder, field, ">", value),
        Filter::Gte { field, value } => push_range(builder, field, ">=", value),
        Filter::Lt { field, value } => push_range(builder, field, "<", value),
        Filter::Lte { field, value } => push_range(builder, field, "<=", value),
        Filter::In { values, .. } if values.is_empty() => {
            builder.push("FALSE");
        }
        Filter::In { field, values } => {
            builder.push("COALESCE(");
            push_path(builder, field);
            builder.push(" IN (");
            let mut separated = builder.separated(", ");
            for value in values {
                separated.push_bind(Json(value.clone()));
            }
            separated.push_unseparated("), FALSE)");
        }
        Filter::Exists { field, exists } => {
            builder.push("(");
            push_path(builder, field);
            builder.push(if *exists { " IS NOT NULL)" } else { " IS NULL)" });
        }
        Filter::And { filters } if filters.is_empty() => {
            builder.push("TRUE");
        }
        Filter::And { filters } => push_group(builder, filters, " AND "),
        Filter::Or { filters } if filters.is_empty() => {
            builder.push("FALSE");
        }
        Filter::Or { filters } => push_group(builder, filters, " OR "),
        Filter::Not { filter } => {
            builder.push("(NOT ");
            push_filter(builder, filter);
            builder.push(")");
        }
    }
}

/// `SELECT doc` with filter, sort, skip and limit
pub fn select_documents(
    table: &str,
    filter: &Filter,
    options: &FindOptions,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT doc FROM {} WHERE ", table));
    push_filter(&mut builder, filter);

    builder.push(" ORDER BY ");
    if let Some(sort) = &options.sort {
        push_path(&mut builder, &sort.field);
        builder.push(match sort.direction {
            SortDirection::Ascending => " ASC NULLS LAST, ",
            SortDirection::Descending => " DESC NULLS FIRST, ",
        });
    }
    builder.push("seq ASC");

    if options.skip > 0 {
        builder.push(" OFFSET ");
        builder.push_bind(clamp_i64(options.skip));
    }
    if let Some(limit) = options.limit {
        builder.push(" LIMIT ");
        builder.push_bind(clamp_i64(limit));
    }
    builder
}

/// `SELECT COUNT(*)` with filter
pub fn count_documents(table: &str, filter: &Filter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {} WHERE ", table));
    push_filter(&mut builder, filter);
    builder
}

/// Deletes the first matching row in natural order
pub fn delete_first(table: &str, filter: &Filter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "DELETE FROM {table} WHERE seq = (SELECT seq FROM {table} WHERE ",
        table = table
    ));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY seq ASC LIMIT 1)");
    builder
}

/// Primary-key lookup of one document
pub fn select_by_id(table: &str, id: &Value) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT doc FROM {} WHERE id = ", table));
    push_value(&mut builder, id);
    builder
}

/// Primary-key delete of one document
pub fn delete_by_id(table: &str, id: &Value) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("DELETE FROM {} WHERE id = ", table));
    push_value(&mut builder, id);
    builder
}

/// Full-document replace keyed by id; unchanged documents are not counted
pub fn replace_document(table: &str, id: &Value, body: &Value) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("UPDATE {} SET doc = ", table));
    push_value(&mut builder, body);
    builder.push(" WHERE id = ");
    push_value(&mut builder, id);
    builder.push(" AND doc IS DISTINCT FROM ");
    push_value(&mut builder, body);
    builder
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
