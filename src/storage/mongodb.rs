//! MongoDB storage backend using the official MongoDB async driver.
//!
//! # Feature flag
//!
//! This module is gated behind the `mongodb_backend` feature flag.
//!
//! # Storage model
//!
//! Each collection of the store is a MongoDB collection of the same name.
//! Documents go through `serde_json::Value` before becoming BSON, so ids
//! (UUID strings) and timestamps (RFC 3339 strings) keep the shape the
//! in-memory store gives them. The `id` field is mapped to MongoDB's `_id`.
//!
//! # Query translation
//!
//! Query values arrive as strings while MongoDB compares typed BSON. An
//! equality clause therefore matches any of the string, number and boolean
//! readings of its literal, and a range clause compares as a number when the
//! literal parses as one.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document as BsonDocument, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use serde_json::Value;

use crate::core::query::{
    FilterExpression, ID_FIELD, Predicate, Projection, QueryValue, SortDirection, SortSpec,
};
use crate::core::store::{
    Document, DocumentStore, FindOptions, StoreError, StoreResult, document_id, parse_id,
};

const BACKEND: &str = "mongodb";
const MONGO_ID: &str = "_id";
const DUPLICATE_KEY: i32 = 11000;

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn backend_error(err: mongodb::error::Error) -> StoreError {
    StoreError::backend(BACKEND, err)
}

/// Classify a write failure, recognizing unique index violations
fn write_error(collection: &str, err: mongodb::error::Error) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY => {
            StoreError::Duplicate {
                collection: collection.to_string(),
                fields: Vec::new(),
            }
        }
        _ => backend_error(err),
    }
}

/// Store field name of a document field
fn mongo_field(field: &str) -> &str {
    if field == ID_FIELD { MONGO_ID } else { field }
}

/// Convert a JSON document into BSON, renaming `id` → `_id`
fn to_bson_document(document: Document) -> StoreResult<BsonDocument> {
    let bson = mongodb::bson::to_bson(&Value::Object(document))
        .map_err(|e| StoreError::backend(BACKEND, format!("Failed to convert to BSON: {}", e)))?;

    let mut doc = match bson {
        Bson::Document(d) => d,
        _ => return Err(StoreError::backend(BACKEND, "Expected BSON document")),
    };
    if let Some(id) = doc.remove(ID_FIELD) {
        doc.insert(MONGO_ID, id);
    }
    Ok(doc)
}

/// Convert a BSON document back into JSON, renaming `_id` → `id`
fn from_bson_document(mut doc: BsonDocument) -> Document {
    if let Some(id) = doc.remove(MONGO_ID) {
        doc.insert(ID_FIELD, id);
    }
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Every typed reading of a query literal
fn literal_variants(value: &QueryValue) -> Vec<Bson> {
    let raw = value.as_str();
    let mut variants = vec![Bson::String(raw.to_string())];

    match raw {
        "true" => variants.push(Bson::Boolean(true)),
        "false" => variants.push(Bson::Boolean(false)),
        _ => {
            if let Ok(i) = raw.parse::<i64>() {
                variants.push(Bson::Int64(i));
                variants.push(Bson::Double(i as f64));
            } else if let Some(f) = value.as_number() {
                variants.push(Bson::Double(f));
            }
        }
    }
    variants
}

/// Range bound of a query literal
fn range_bound(value: &QueryValue) -> Bson {
    match value.as_number() {
        Some(n) => Bson::Double(n),
        None => Bson::String(value.as_str().to_string()),
    }
}

fn predicate_to_bson(predicate: &Predicate) -> Bson {
    match predicate {
        Predicate::Eq(value) => Bson::Document(doc! { "$in": literal_variants(value) }),
        Predicate::Gt(value) => Bson::Document(doc! { "$gt": range_bound(value) }),
        Predicate::Gte(value) => Bson::Document(doc! { "$gte": range_bound(value) }),
        Predicate::Lt(value) => Bson::Document(doc! { "$lt": range_bound(value) }),
        Predicate::Lte(value) => Bson::Document(doc! { "$lte": range_bound(value) }),
        Predicate::In(values) => {
            let variants: Vec<Bson> = values.iter().flat_map(literal_variants).collect();
            Bson::Document(doc! { "$in": variants })
        }
    }
}

/// Translate a filter into a MongoDB query
///
/// Clauses are combined with `$and` so repeated fields keep every clause.
fn filter_to_bson(filter: &FilterExpression) -> BsonDocument {
    if filter.is_empty() {
        return BsonDocument::new();
    }
    let clauses: Vec<Bson> = filter
        .clauses()
        .iter()
        .map(|clause| {
            let mut condition = BsonDocument::new();
            condition.insert(
                mongo_field(&clause.field),
                predicate_to_bson(&clause.predicate),
            );
            Bson::Document(condition)
        })
        .collect();
    doc! { "$and": clauses }
}

/// Translate a sort, always ending with the `_id` tie-break
fn sort_to_bson(sort: &SortSpec) -> BsonDocument {
    let mut order = BsonDocument::new();
    for key in sort.keys() {
        let direction = match key.direction {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        };
        order.insert(mongo_field(&key.field), direction);
    }
    if !order.contains_key(MONGO_ID) {
        order.insert(MONGO_ID, 1);
    }
    order
}

/// Translate a projection
///
/// MongoDB cannot mix inclusion and exclusion, so hidden fields are removed
/// from an explicit selection instead of being excluded.
fn projection_to_bson(projection: &Projection) -> Option<BsonDocument> {
    let hidden = projection.hidden();
    match projection.selected() {
        Some(fields) => {
            let mut include = BsonDocument::new();
            for field in fields.filter(|f| !hidden.iter().any(|h| h == f)) {
                include.insert(mongo_field(field), 1);
            }
            include.insert(MONGO_ID, 1);
            Some(include)
        }
        None if hidden.is_empty() => None,
        None => {
            let mut exclude = BsonDocument::new();
            for field in hidden {
                exclude.insert(mongo_field(field), 0);
            }
            Some(exclude)
        }
    }
}

// ---------------------------------------------------------------------------
// MongoStore
// ---------------------------------------------------------------------------

/// Document store backed by MongoDB
///
/// # Example
///
/// ```rust,ignore
/// use mongodb::Client;
/// use devcamper::storage::MongoStore;
///
/// let client = Client::with_uri_str("mongodb://localhost:27017").await?;
/// let store = MongoStore::new(client.database("devcamper"));
/// ```
#[derive(Clone, Debug)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Create a new `MongoStore` with the given database handle.
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Connect to `uri` and use the database `name`
    pub async fn connect(uri: &str, name: &str) -> StoreResult<Self> {
        let client = mongodb::Client::with_uri_str(uri)
            .await
            .map_err(backend_error)?;
        Ok(Self::new(client.database(name)))
    }

    fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.database.collection(name)
    }

    async fn find_raw_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let found = self
            .collection(collection)
            .find_one(doc! { MONGO_ID: id })
            .await
            .map_err(backend_error)?;
        Ok(found.map(from_bson_document))
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn insert(&self, collection: &str, document: Document) -> StoreResult<Document> {
        let id = document_id(&document)
            .ok_or_else(|| StoreError::backend(BACKEND, "document has no id"))?
            .to_string();
        parse_id(&id)?;

        self.collection(collection)
            .insert_one(to_bson_document(document)?)
            .await
            .map_err(|e| write_error(collection, e))?;

        self.find_raw_by_id(collection, &id)
            .await?
            .ok_or_else(|| StoreError::backend(BACKEND, "document not found after insert"))
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        parse_id(id)?;
        self.find_raw_by_id(collection, id).await
    }

    async fn find(&self, collection: &str, options: &FindOptions) -> StoreResult<Vec<Document>> {
        let mut action = self
            .collection(collection)
            .find(filter_to_bson(&options.filter))
            .sort(sort_to_bson(&options.sort))
            .skip(options.skip);
        if let Some(limit) = options.limit {
            action = action.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(projection) = projection_to_bson(&options.projection) {
            action = action.projection(projection);
        }

        let docs: Vec<BsonDocument> = action
            .await
            .map_err(backend_error)?
            .try_collect()
            .await
            .map_err(backend_error)?;

        Ok(docs.into_iter().map(from_bson_document).collect())
    }

    async fn count(&self, collection: &str, filter: &FilterExpression) -> StoreResult<u64> {
        self.collection(collection)
            .count_documents(filter_to_bson(filter))
            .await
            .map_err(backend_error)
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        mut document: Document,
    ) -> StoreResult<Option<Document>> {
        parse_id(id)?;
        document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

        let result = self
            .collection(collection)
            .replace_one(doc! { MONGO_ID: id }, to_bson_document(document)?)
            .await
            .map_err(|e| write_error(collection, e))?;
        if result.matched_count == 0 {
            return Ok(None);
        }

        self.find_raw_by_id(collection, id).await
    }

    async fn set_fields(
        &self,
        collection: &str,
        id: &str,
        mut set: Document,
        unset: &[String],
    ) -> StoreResult<Option<Document>> {
        parse_id(id)?;
        set.remove(ID_FIELD);

        let mut update = BsonDocument::new();
        if !set.is_empty() {
            update.insert("$set", to_bson_document(set)?);
        }
        let removed: BsonDocument = unset
            .iter()
            .filter(|f| f.as_str() != ID_FIELD)
            .map(|f| (f.clone(), Bson::String(String::new())))
            .collect();
        if !removed.is_empty() {
            update.insert("$unset", removed);
        }
        if update.is_empty() {
            return self.find_raw_by_id(collection, id).await;
        }

        let result = self
            .collection(collection)
            .update_one(doc! { MONGO_ID: id }, update)
            .await
            .map_err(|e| write_error(collection, e))?;
        if result.matched_count == 0 {
            return Ok(None);
        }

        self.find_raw_by_id(collection, id).await
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> StoreResult<bool> {
        parse_id(id)?;
        let result = self
            .collection(collection)
            .delete_one(doc! { MONGO_ID: id })
            .await
            .map_err(backend_error)?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_many(&self, collection: &str, filter: &FilterExpression) -> StoreResult<u64> {
        let result = self
            .collection(collection)
            .delete_many(filter_to_bson(filter))
            .await
            .map_err(backend_error)?;
        Ok(result.deleted_count)
    }

    /// Create a unique index; idempotent, safe to call on every startup.
    async fn ensure_unique_index(&self, collection: &str, fields: &[&str]) -> StoreResult<()> {
        let mut keys = BsonDocument::new();
        for field in fields {
            keys.insert(mongo_field(field), 1);
        }
        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection(collection)
            .create_index(index)
            .await
            .map_err(backend_error)?;
        Ok(())
    }
}
