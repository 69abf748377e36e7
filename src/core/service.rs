//! Typed access to a collection

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::core::entity::Entity;
use crate::core::error::ApiError;
use crate::core::query::{FilterExpression, SortSpec};
use crate::core::store::{Document, DocumentStore, FindOptions};

pub fn to_document<T: Serialize>(value: &T) -> Result<Document, ApiError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ApiError::Internal(format!(
            "expected a JSON object, got {}",
            other
        ))),
        Err(e) => Err(ApiError::Internal(format!("serialization failed: {}", e))),
    }
}

/// Deserialize a stored or patched document
///
/// Type mismatches are the client's fault when the document carries their
/// input, so they surface as 400.
pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, ApiError> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| ApiError::bad_request(format!("Invalid field value: {}", e)))
}

/// Keep only the fields a client may write
pub fn writable_subset(input: &Document, fields: &[&str]) -> Document {
    input
        .iter()
        .filter(|(key, _)| fields.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// CRUD operations for one entity type
///
/// Every write validates the entity first; validation failures are 400s and
/// leave the store untouched.
pub struct EntityService<E> {
    store: Arc<dyn DocumentStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityService<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> EntityService<E> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn collection(&self) -> &'static str {
        E::resource_name()
    }

    /// Declare this entity's unique indexes on the store
    pub async fn ensure_indexes(&self) -> Result<(), ApiError> {
        for fields in E::unique_indexes() {
            self.store
                .ensure_unique_index(E::resource_name(), fields)
                .await?;
        }
        Ok(())
    }

    /// Response form of an entity, hidden fields removed
    pub fn present(entity: &E) -> Result<Document, ApiError> {
        let mut document = to_document(entity)?;
        for field in E::hidden_fields() {
            document.remove(*field);
        }
        Ok(document)
    }

    pub async fn create(&self, entity: E) -> Result<E, ApiError> {
        entity.validate()?;
        let stored = self
            .store
            .insert(E::resource_name(), to_document(&entity)?)
            .await?;
        tracing::info!(id = entity.id(), "created {}", E::resource_name_singular());
        from_document(stored)
    }

    pub async fn get(&self, id: &str) -> Result<Option<E>, ApiError> {
        self.store
            .find_by_id(E::resource_name(), id)
            .await?
            .map(from_document)
            .transpose()
    }

    /// Like `get`, failing with 404 when the record does not exist
    pub async fn require(&self, id: &str) -> Result<E, ApiError> {
        self.get(id)
            .await?
            .ok_or_else(|| ApiError::not_found(E::resource_name_singular(), id))
    }

    pub async fn update(&self, entity: E) -> Result<E, ApiError> {
        entity.validate()?;
        let id = entity.id().to_string();
        self.store
            .update_by_id(E::resource_name(), &id, to_document(&entity)?)
            .await?
            .map(from_document)
            .transpose()?
            .ok_or_else(|| ApiError::not_found(E::resource_name_singular(), id))
    }

    /// Write only `fields` of an entity, leaving the rest of the stored
    /// record as it is
    ///
    /// Fields the entity serializes without are removed from the record.
    pub async fn save_fields(&self, entity: &E, fields: &[&str]) -> Result<E, ApiError> {
        entity.validate()?;
        let mut document = to_document(entity)?;
        let mut set = Document::new();
        let mut unset = Vec::new();
        for field in fields {
            match document.remove(*field) {
                Some(value) => {
                    set.insert(field.to_string(), value);
                }
                None => unset.push(field.to_string()),
            }
        }

        let id = entity.id();
        self.store
            .set_fields(E::resource_name(), id, set, &unset)
            .await?
            .map(from_document)
            .transpose()?
            .ok_or_else(|| ApiError::not_found(E::resource_name_singular(), id))
    }

    /// Apply a client patch of writable fields to a stored record
    pub async fn patch(&self, id: &str, input: &Document) -> Result<E, ApiError> {
        let existing = self.require(id).await?;
        let mut document = to_document(&existing)?;
        document.extend(writable_subset(input, E::writable_fields()));
        self.update(from_document(document)?).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, ApiError> {
        Ok(self.store.delete_by_id(E::resource_name(), id).await?)
    }

    pub async fn find_where(&self, filter: FilterExpression) -> Result<Vec<E>, ApiError> {
        let options = FindOptions::new(filter).with_sort(SortSpec::default_order());
        self.store
            .find(E::resource_name(), &options)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn find_one_where(&self, filter: FilterExpression) -> Result<Option<E>, ApiError> {
        let options = FindOptions {
            limit: Some(1),
            ..FindOptions::new(filter)
        };
        self.store
            .find(E::resource_name(), &options)
            .await?
            .into_iter()
            .next()
            .map(from_document)
            .transpose()
    }

    pub async fn delete_where(&self, filter: &FilterExpression) -> Result<u64, ApiError> {
        Ok(self.store.delete_many(E::resource_name(), filter).await?)
    }
}
