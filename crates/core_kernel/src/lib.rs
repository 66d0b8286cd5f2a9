//! Core Kernel - store-agnostic building blocks for the document repository
//!
//! This crate provides the contracts shared by every store back-end:
//! - The entity and identifier capabilities
//! - A translatable filter expression language
//! - Sort and paging descriptors
//! - The store error taxonomy
//! - Ports for collection handles and the contexts that supply them

pub mod entity;
pub mod error;
pub mod filter;
pub mod identifiers;
pub mod paging;
pub mod ports;

pub use entity::{Document, Entity};
pub use error::{StoreError, StoreResult, WriteErrorKind};
pub use filter::{FieldPath, Filter};
pub use identifiers::EntityId;
pub use paging::{FindOptions, PageRequest, SortDirection, SortSpec};
pub use ports::{
    CollectionContext, DocumentCollection, HealthCheckResult, HealthCheckable, StoreHealth,
};

/// Paths used by exported macros
#[doc(hidden)]
pub mod __private {
    pub use serde;
    pub use uuid;
}
