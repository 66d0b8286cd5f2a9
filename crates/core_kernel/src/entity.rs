//! Entity contract and the stored document form
//!
//! The repository never constructs entities. It only marshals them into
//! [`Document`]s on the way in and decodes them on the way out.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{StoreError, StoreResult, WriteErrorKind};
use crate::identifiers::EntityId;

/// A record type persisted in a document collection
///
/// # Example
///
/// ```rust
/// use core_kernel::Entity;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Customer {
///     id: i64,
///     name: String,
/// }
///
/// impl Entity for Customer {
///     type Id = i64;
///     const COLLECTION: &'static str = "customers";
///
///     fn id(&self) -> &i64 {
///         &self.id
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Identifier type, unique within the collection
    type Id: EntityId;

    /// Name of the collection holding this entity type
    const COLLECTION: &'static str;

    /// Document field that carries the identifier
    const ID_FIELD: &'static str = "id";

    /// Returns the identifier of this entity
    fn id(&self) -> &Self::Id;
}

/// The stored form of an entity: its identifier and full JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Value,
    pub body: Value,
}

impl Document {
    /// Serialises an entity into a document
    ///
    /// # Errors
    ///
    /// Returns a `Serialization` write error if the entity does not serialise
    /// to a JSON object, or if the serialised identifier field does not match
    /// `Entity::id`.
    pub fn from_entity<T: Entity>(entity: &T) -> StoreResult<Self> {
        let id = id_value::<T>(entity.id())?;
        let body = serde_json::to_value(entity)
            .map_err(|e| StoreError::write(WriteErrorKind::Serialization, e.to_string()))?;

        let Some(fields) = body.as_object() else {
            return Err(StoreError::write(
                WriteErrorKind::Serialization,
                format!("{} entity must serialise to a JSON object", T::COLLECTION),
            ));
        };

        if fields.get(T::ID_FIELD) != Some(&id) {
            return Err(StoreError::write(
                WriteErrorKind::Serialization,
                format!(
                    "{} document field '{}' does not carry the entity id {}",
                    T::COLLECTION,
                    T::ID_FIELD,
                    entity.id()
                ),
            ));
        }

        Ok(Self { id, body })
    }

    /// Decodes the document body back into an entity
    pub fn to_entity<T: Entity>(&self) -> StoreResult<T> {
        decode_body(self.body.clone())
    }
}

/// Serialises an identifier into its stored key form
pub fn id_value<T: Entity>(id: &T::Id) -> StoreResult<Value> {
    serde_json::to_value(id)
        .map_err(|e| StoreError::write(WriteErrorKind::Serialization, e.to_string()))
}

/// Decodes a stored document body into an entity
pub fn decode_body<T: Entity>(body: Value) -> StoreResult<T> {
    serde_json::from_value(body)
        .map_err(|e| StoreError::decode(format!("{}: {}", T::COLLECTION, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: i64,
        text: String,
    }

    impl Entity for Note {
        type Id = i64;
        const COLLECTION: &'static str = "notes";

        fn id(&self) -> &i64 {
            &self.id
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Renamed {
        #[serde(rename = "_id")]
        key: String,
    }

    impl Entity for Renamed {
        type Id = String;
        const COLLECTION: &'static str = "renamed";

        fn id(&self) -> &String {
            &self.key
        }
    }

    #[test]
    fn test_document_round_trip() {
        let note = Note {
            id: 3,
            text: "hello".to_string(),
        };
        let doc = Document::from_entity(&note).unwrap();
        assert_eq!(doc.id, serde_json::json!(3));
        assert_eq!(doc.to_entity::<Note>().unwrap(), note);
    }

    #[test]
    fn test_mismatched_id_field_is_rejected() {
        let entity = Renamed {
            key: "a".to_string(),
        };
        let error = Document::from_entity(&entity).unwrap_err();
        assert!(matches!(
            error,
            StoreError::Write {
                kind: WriteErrorKind::Serialization,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_failure_is_categorised() {
        let error = decode_body::<Note>(serde_json::json!({"id": "x"})).unwrap_err();
        assert!(matches!(error, StoreError::Decode { .. }));
    }
}
