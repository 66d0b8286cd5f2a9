//! Identifier capability and strongly-typed identifiers
//!
//! Any type that is comparable, hashable, printable and serialisable can act
//! as an entity identifier. Integers and strings work out of the box;
//! `define_id!` produces UUID newtypes for applications that want identifiers
//! that cannot be mixed up.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::hash::Hash;

/// Capability required from an entity identifier
///
/// The serialised form of the identifier is the primary key in the store, so
/// two identifiers that are equal must serialise identically.
pub trait EntityId:
    Clone + Eq + Hash + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> EntityId for T where
    T: Clone
        + Eq
        + Hash
        + fmt::Debug
        + fmt::Display
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Defines a UUID-backed identifier newtype with a display prefix
///
/// ```rust
/// core_kernel::define_id!(OrderId, "ORD");
///
/// let id = OrderId::new();
/// assert!(id.to_string().starts_with("ORD-"));
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
        )]
        pub struct $name($crate::__private::uuid::Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self($crate::__private::uuid::Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self($crate::__private::uuid::Uuid::now_v7())
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &$crate::__private::uuid::Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl $crate::__private::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: $crate::__private::serde::Serializer,
            {
                $crate::__private::serde::Serialize::serialize(&self.0, serializer)
            }
        }

        impl<'de> $crate::__private::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
            where
                D: $crate::__private::serde::Deserializer<'de>,
            {
                <$crate::__private::uuid::Uuid as $crate::__private::serde::Deserialize>::deserialize(
                    deserializer,
                )
                .map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::__private::uuid::Error;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self($crate::__private::uuid::Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<$crate::__private::uuid::Uuid> for $name {
            fn from(uuid: $crate::__private::uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for $crate::__private::uuid::Uuid {
            fn from(id: $name) -> $crate::__private::uuid::Uuid {
                id.0
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    define_id!(SampleId, "SMP");

    fn assert_entity_id<T: super::EntityId>() {}

    #[test]
    fn test_builtin_types_are_identifiers() {
        assert_entity_id::<i64>();
        assert_entity_id::<i32>();
        assert_entity_id::<u64>();
        assert_entity_id::<String>();
        assert_entity_id::<Uuid>();
        assert_entity_id::<SampleId>();
    }

    #[test]
    fn test_typed_id_parsing() {
        let original = SampleId::new();
        let parsed: SampleId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_typed_id_serializes_as_bare_uuid() {
        let uuid = Uuid::new_v4();
        let id = SampleId::from(uuid);
        let value = serde_json::to_value(id).unwrap();
        assert_eq!(value, serde_json::Value::String(uuid.to_string()));
    }
}
