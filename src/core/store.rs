//! Document store trait shared by every storage backend
//!
//! Records are JSON objects grouped by collection name. Every record carries
//! a string `id` (a UUID) assigned by the caller before insertion. Backends
//! evaluate [`FilterExpression`], [`SortSpec`] and [`Projection`] with the
//! same semantics so the query engine behaves identically over any store.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::core::error::FieldValidationError;
use crate::core::query::{FilterExpression, ID_FIELD, PageWindow, Projection, SortSpec};

/// A stored record
pub type Document = Map<String, Value>;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a document store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The identifier is not a well-formed UUID
    #[error("Malformed identifier '{value}'")]
    MalformedId { value: String },

    /// A unique index rejected the write
    #[error("Duplicate value for {fields:?} in '{collection}'")]
    Duplicate {
        collection: String,
        fields: Vec<String>,
    },

    /// The record failed schema validation
    #[error("Validation failed: {}", format_fields(.0))]
    Validation(Vec<FieldValidationError>),

    /// Anything else the backend reports
    #[error("{backend} error: {message}")]
    Backend { backend: String, message: String },
}

fn format_fields(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl StoreError {
    pub fn backend(backend: impl Into<String>, message: impl ToString) -> Self {
        StoreError::Backend {
            backend: backend.into(),
            message: message.to_string(),
        }
    }
}

/// Reject identifiers that could never match a record
pub fn parse_id(id: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| StoreError::MalformedId {
        value: id.to_string(),
    })
}

/// The `id` of a document, if it has one
pub fn document_id(document: &Document) -> Option<&str> {
    document.get(ID_FIELD).and_then(Value::as_str)
}

/// Options of a `find` call
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub filter: FilterExpression,
    pub projection: Projection,
    pub sort: SortSpec,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn new(filter: FilterExpression) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_window(mut self, window: PageWindow) -> Self {
        self.skip = window.start_index();
        self.limit = Some(window.limit);
        self
    }
}

/// Collection-oriented storage over JSON documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name, used in logs and error messages
    fn name(&self) -> &'static str;

    /// Insert a document that already carries its `id`
    async fn insert(&self, collection: &str, document: Document) -> StoreResult<Document>;

    /// Fetch a document by id
    ///
    /// Returns `StoreError::MalformedId` when `id` is not a UUID and
    /// `Ok(None)` when no such document exists.
    async fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Filter, sort, window and project a collection
    async fn find(&self, collection: &str, options: &FindOptions) -> StoreResult<Vec<Document>>;

    /// Number of documents matching the filter
    async fn count(&self, collection: &str, filter: &FilterExpression) -> StoreResult<u64>;

    /// Replace a document, keeping its id
    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<Option<Document>>;

    /// Overwrite the top-level fields in `set` and remove those in `unset`,
    /// leaving every other field untouched
    ///
    /// Returns the merged document, or `None` when no such document exists.
    async fn set_fields(
        &self,
        collection: &str,
        id: &str,
        set: Document,
        unset: &[String],
    ) -> StoreResult<Option<Document>>;

    /// Delete a document, returning whether it existed
    async fn delete_by_id(&self, collection: &str, id: &str) -> StoreResult<bool>;

    /// Delete every document matching the filter
    async fn delete_many(&self, collection: &str, filter: &FilterExpression) -> StoreResult<u64>;

    /// Declare a compound unique index
    async fn ensure_unique_index(&self, collection: &str, fields: &[&str]) -> StoreResult<()>;
}
