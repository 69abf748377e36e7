//! Entity trait defining the core abstraction for all stored resources

use serde::Serialize;
use serde::de::DeserializeOwned;
use validator::Validate;

/// Base trait for all resources kept in the document store.
///
/// An entity serializes to one JSON document of its collection. Every entity
/// has a string `id` (a UUID) and a `createdAt` timestamp.
pub trait Entity: Serialize + DeserializeOwned + Validate + Clone + Send + Sync + 'static {
    /// The plural resource name, also the collection name (e.g. "bootcamps")
    fn resource_name() -> &'static str;

    /// The singular name used in messages (e.g. "Bootcamp")
    fn resource_name_singular() -> &'static str;

    fn id(&self) -> &str;

    /// The user that owns this record, if ownership applies
    fn owner_id(&self) -> Option<&str> {
        None
    }

    /// Fields a client may set on create and update
    fn writable_fields() -> &'static [&'static str];

    /// Fields never included in responses
    fn hidden_fields() -> &'static [&'static str] {
        &[]
    }

    /// Compound unique indexes of the collection
    fn unique_indexes() -> &'static [&'static [&'static str]] {
        &[]
    }
}
