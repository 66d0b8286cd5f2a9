//! PostgreSQL document collections
//!
//! `PgContext` maps a configured logical database onto a PostgreSQL schema and
//! hands out `PgCollection` handles, one table per collection. Tables are
//! created on first use.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{PgContext, Repository, StoreConfig};
//!
//! let context = PgContext::connect(&StoreConfig::from_env()?).await?;
//! let articles: Repository<Article> = Repository::new(&context);
//! ```

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use core_kernel::entity::decode_body;
use core_kernel::{
    CollectionContext, Document, DocumentCollection, Entity, Filter, FindOptions,
    HealthCheckResult, HealthCheckable, StoreError, StoreHealth, StoreResult,
};

use crate::error::{read_error, write_error};
use crate::pool::{create_pool, StoreConfig};
use crate::sql;

/// Rows per INSERT statement in `insert_many`
const INSERT_CHUNK_ROWS: usize = 1000;

/// PostgreSQL-backed collection context
#[derive(Debug, Clone)]
pub struct PgContext {
    pool: PgPool,
    schema: String,
}

impl PgContext {
    /// Wraps an existing pool; the schema must already exist
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    /// Creates a pool from the configuration and makes sure the schema exists
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        sql::validate_identifier(&config.database)?;
        let pool = create_pool(config).await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = $1)",
        )
        .bind(&config.database)
        .fetch_one(&pool)
        .await
        .map_err(read_error)?;

        if !exists {
            info!(schema = %config.database, "Creating schema");
            sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", config.database))
                .execute(&pool)
                .await
                .map_err(write_error)?;
        }

        Ok(Self::new(pool, config.database.clone()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }
}

impl CollectionContext for PgContext {
    fn collection<T: Entity>(&self) -> Arc<dyn DocumentCollection<T>> {
        Arc::new(PgCollection::<T>::new(self.pool.clone(), &self.schema))
    }
}

#[async_trait]
impl HealthCheckable for PgContext {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(_) => (StoreHealth::Healthy, None),
            Err(e) => (StoreHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };

        HealthCheckResult {
            store_id: format!("postgres:{}", self.schema),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

/// One collection stored as a JSONB table
pub struct PgCollection<T> {
    pool: PgPool,
    table: Result<String, String>,
    ready: OnceCell<()>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> PgCollection<T> {
    pub fn new(pool: PgPool, schema: &str) -> Self {
        Self {
            pool,
            table: sql::qualified_table(schema, T::COLLECTION).map_err(|e| e.to_string()),
            ready: OnceCell::new(),
            _entity: PhantomData,
        }
    }

    /// Returns the table name, creating the table on first use
    async fn table(&self) -> StoreResult<&str> {
        let table = self
            .table
            .as_deref()
            .map_err(|_| StoreError::InvalidCollection(T::COLLECTION.to_string()))?;

        self.ready
            .get_or_try_init(|| async {
                debug!(table, "Ensuring collection table");
                for statement in sql::create_table_sql(table, T::COLLECTION) {
                    sqlx::query(&statement)
                        .execute(&self.pool)
                        .await
                        .map_err(write_error)?;
                }
                Ok::<(), StoreError>(())
            })
            .await?;

        Ok(table)
    }
}

fn decode_rows<T: Entity>(rows: Vec<Json<Value>>) -> StoreResult<Vec<T>> {
    rows.into_iter().map(|Json(body)| decode_body(body)).collect()
}

#[async_trait]
impl<T: Entity> DocumentCollection<T> for PgCollection<T> {
    fn name(&self) -> &str {
        T::COLLECTION
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    async fn insert_one(&self, entity: &T) -> StoreResult<()> {
        let document = Document::from_entity(entity)?;
        let table = self.table().await?;

        sqlx::query(&format!("INSERT INTO {} (id, doc) VALUES ($1, $2)", table))
            .bind(Json(document.id))
            .bind(Json(document.body))
            .execute(&self.pool)
            .await
            .map_err(write_error)?;

        Ok(())
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION, count = entities.len()))]
    async fn insert_many(&self, entities: &[T]) -> StoreResult<()> {
        let documents = entities
            .iter()
            .map(Document::from_entity)
            .collect::<StoreResult<Vec<_>>>()?;
        let table = self.table().await?;

        let mut tx = self.pool.begin().await.map_err(write_error)?;
        for chunk in documents.chunks(INSERT_CHUNK_ROWS) {
            let mut builder =
                sqlx::QueryBuilder::new(format!("INSERT INTO {} (id, doc) ", table));
            builder.push_values(chunk, |mut row, document| {
                row.push_bind(Json(document.id.clone()))
                    .push_bind(Json(document.body.clone()));
            });
            builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(write_error)?;
        }
        tx.commit().await.map_err(write_error)?;

        Ok(())
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        let table = self.table().await?;
        let count: i64 = sql::count_documents(table, filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(read_error)?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    async fn delete_one(&self, filter: &Filter) -> StoreResult<u64> {
        let table = self.table().await?;
        let result = sql::delete_first(table, filter)
            .build()
            .execute(&self.pool)
            .await
            .map_err(write_error)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    async fn find(&self, filter: &Filter, options: &FindOptions) -> StoreResult<Vec<T>> {
        let table = self.table().await?;
        let rows: Vec<Json<Value>> = sql::select_documents(table, filter, options)
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .map_err(read_error)?;

        decode_rows(rows)
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<T>> {
        let table = self.table().await?;
        let options = FindOptions {
            limit: Some(1),
            ..FindOptions::default()
        };
        let row: Option<Json<Value>> = sql::select_documents(table, filter, &options)
            .build_query_scalar()
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error)?;

        row.map(|Json(body)| decode_body(body)).transpose()
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    async fn find_by_id(&self, id: &Value) -> StoreResult<Option<T>> {
        let table = self.table().await?;
        let row: Option<Json<Value>> = sql::select_by_id(table, id)
            .build_query_scalar()
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error)?;

        row.map(|Json(body)| decode_body(body)).transpose()
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    async fn delete_by_id(&self, id: &Value) -> StoreResult<u64> {
        let table = self.table().await?;
        let result = sql::delete_by_id(table, id)
            .build()
            .execute(&self.pool)
            .await
            .map_err(write_error)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    async fn replace_one(&self, entity: &T) -> StoreResult<u64> {
        let document = Document::from_entity(entity)?;
        let table = self.table().await?;
        let result = sql::replace_document(table, &document.id, &document.body)
            .build()
            .execute(&self.pool)
            .await
            .map_err(write_error)?;

        Ok(result.rows_affected())
    }
}
