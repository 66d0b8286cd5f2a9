//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! document store test suite.
//!
//! # Modules
//!
//! - `fixtures`: The `Article` test entity and ready-made sets of it
//! - `builders`: Builder for articles with faked defaults
//! - `database`: PostgreSQL container management
//! - `faulty`: A collection wrapper that injects failures and latency
//! - `assertions`: Assertion helpers for store results
//! - `generators`: Property-based test data generators
//! - `logging`: One-time log subscriber for tests

pub mod assertions;
pub mod builders;
pub mod database;
pub mod faulty;
pub mod fixtures;
pub mod generators;
pub mod logging;

pub use assertions::*;
pub use builders::*;
pub use database::*;
pub use faulty::*;
pub use fixtures::*;
pub use generators::*;
pub use logging::init_test_tracing;
