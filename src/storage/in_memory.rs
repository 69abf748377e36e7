//! In-memory document store for testing and development

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::core::query::{FilterExpression, ID_FIELD, lookup_path};
use crate::core::store::{
    Document, DocumentStore, FindOptions, StoreError, StoreResult, document_id, parse_id,
};

const BACKEND: &str = "in-memory";

#[derive(Default)]
struct Collections {
    documents: HashMap<String, Vec<Document>>,
    unique_indexes: HashMap<String, Vec<Vec<String>>>,
}

impl Collections {
    /// Fail if `candidate` collides with another document on a unique index
    fn check_unique(&self, collection: &str, candidate: &Document) -> StoreResult<()> {
        let Some(indexes) = self.unique_indexes.get(collection) else {
            return Ok(());
        };
        let Some(documents) = self.documents.get(collection) else {
            return Ok(());
        };
        let candidate_id = document_id(candidate);

        for fields in indexes {
            let Some(key) = index_key(candidate, fields) else {
                continue;
            };
            let collides = documents
                .iter()
                .filter(|doc| document_id(doc) != candidate_id)
                .any(|doc| index_key(doc, fields).as_ref() == Some(&key));
            if collides {
                return Err(StoreError::Duplicate {
                    collection: collection.to_string(),
                    fields: fields.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Values of the indexed fields, or `None` when any of them is unset
fn index_key(document: &Document, fields: &[String]) -> Option<Vec<Value>> {
    fields
        .iter()
        .map(|f| match lookup_path(document, f) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.clone()),
        })
        .collect()
}

/// In-memory document store
///
/// Uses RwLock for thread-safe access. Collections are created on first write.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Collections>> {
        self.inner
            .read()
            .map_err(|e| StoreError::backend(BACKEND, format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Collections>> {
        self.inner
            .write()
            .map_err(|e| StoreError::backend(BACKEND, format!("Failed to acquire write lock: {}", e)))
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn insert(&self, collection: &str, document: Document) -> StoreResult<Document> {
        let id = document_id(&document)
            .ok_or_else(|| StoreError::backend(BACKEND, "document has no id"))?;
        parse_id(id)?;

        let mut state = self.write()?;
        state.check_unique(collection, &document)?;
        state
            .documents
            .entry(collection.to_string())
            .or_default()
            .push(document.clone());

        Ok(document)
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        parse_id(id)?;
        let state = self.read()?;

        Ok(state
            .documents
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| document_id(d) == Some(id)))
            .cloned())
    }

    async fn find(&self, collection: &str, options: &FindOptions) -> StoreResult<Vec<Document>> {
        let mut matching: Vec<Document> = {
            let state = self.read()?;
            state
                .documents
                .get(collection)
                .map(|docs| {
                    docs.iter()
                        .filter(|d| options.filter.matches(d))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };

        matching.sort_by(|a, b| options.sort.compare(a, b));

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let take = options
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(matching
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|d| options.projection.apply(d))
            .collect())
    }

    async fn count(&self, collection: &str, filter: &FilterExpression) -> StoreResult<u64> {
        let state = self.read()?;
        let count = state
            .documents
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count())
            .unwrap_or(0);

        Ok(count as u64)
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        mut document: Document,
    ) -> StoreResult<Option<Document>> {
        parse_id(id)?;
        document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

        let mut state = self.write()?;
        state.check_unique(collection, &document)?;

        let Some(slot) = state
            .documents
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| document_id(d) == Some(id)))
        else {
            return Ok(None);
        };
        *slot = document.clone();

        Ok(Some(document))
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

        let mut state = self.write()?;
        let Some(mut merged) = state
            .documents
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| document_id(d) == Some(id)))
            .cloned()
        else {
            return Ok(None);
        };
        merged.extend(set);
        for field in unset.iter().filter(|f| f.as_str() != ID_FIELD) {
            merged.remove(field);
        }
        state.check_unique(collection, &merged)?;

        if let Some(slot) = state
            .documents
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| document_id(d) == Some(id)))
        {
            *slot = merged.clone();
        }
        Ok(Some(merged))
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> StoreResult<bool> {
        parse_id(id)?;
        let mut state = self.write()?;

        let Some(docs) = state.documents.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| document_id(d) != Some(id));

        Ok(docs.len() < before)
    }

    async fn delete_many(&self, collection: &str, filter: &FilterExpression) -> StoreResult<u64> {
        let mut state = self.write()?;

        let Some(docs) = state.documents.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));

        Ok((before - docs.len()) as u64)
    }

    async fn ensure_unique_index(&self, collection: &str, fields: &[&str]) -> StoreResult<()> {
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        let mut state = self.write()?;

        let indexes = state
            .unique_indexes
            .entry(collection.to_string())
            .or_default();
        if !indexes.contains(&fields) {
            indexes.push(fields);
        }
        Ok(())
    }
}
