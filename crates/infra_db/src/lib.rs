//! Document store infrastructure
//!
//! This crate implements the store ports declared in `core_kernel` and the
//! generic [`Repository`] on top of them.
//!
//! # Back-ends
//!
//! - [`PgContext`]: PostgreSQL, one JSONB table per collection, using SQLx
//! - [`MemoryContext`]: in-process collections for tests and embedding
//!
//! Both back-ends share the same filter, ordering and identifier semantics.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{PgContext, Repository, StoreConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let context = PgContext::connect(&StoreConfig::from_env()?).await?;
//! let articles: Repository<Article> = Repository::new(&context);
//! let count = articles.count(&Filter::All, &CancellationToken::new()).await?;
//! ```

pub mod blocking;
pub mod error;
pub mod memory;
pub mod pool;
pub mod postgres;
pub mod repository;
pub mod sql;

pub use blocking::{BlockingEntityList, BlockingRepository};
pub use error::DatabaseError;
pub use memory::{MemoryCollection, MemoryContext};
pub use pool::{create_pool, DatabasePool, StoreConfig};
pub use postgres::{PgCollection, PgContext};
pub use repository::{EntityList, Repository};
pub use tokio_util::sync::CancellationToken;
