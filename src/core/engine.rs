//! List-query engine
//!
//! Turns a [`RawQuery`] into a [`ListQuery`], counts the matching records,
//! fetches the requested window and populates relation fields.
//!
//! The count and the windowed fetch are two independent reads. A write that
//! lands between them can make `pagination.total` disagree with the page.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::query::{
    FilterExpression, ID_FIELD, ListQuery, PaginationMeta, Predicate, Projection, QueryOptions,
    QueryValue, RawQuery, ResultEnvelope, SortSpec,
};
use crate::core::store::{Document, DocumentStore, FindOptions, StoreResult, document_id};

/// How a relation field is expanded in query results
#[derive(Debug, Clone, PartialEq)]
pub enum PopulateSpec {
    /// Replace a foreign-key field by the referenced record
    Reference {
        field: String,
        collection: String,
        projection: Projection,
    },

    /// Add a virtual field listing the records that point back at this one
    Children {
        field: String,
        collection: String,
        foreign_field: String,
        projection: Projection,
    },
}

impl PopulateSpec {
    pub fn reference(
        field: impl Into<String>,
        collection: impl Into<String>,
        projection: Projection,
    ) -> Self {
        PopulateSpec::Reference {
            field: field.into(),
            collection: collection.into(),
            projection,
        }
    }

    pub fn children(
        field: impl Into<String>,
        collection: impl Into<String>,
        foreign_field: impl Into<String>,
        projection: Projection,
    ) -> Self {
        PopulateSpec::Children {
            field: field.into(),
            collection: collection.into(),
            foreign_field: foreign_field.into(),
            projection,
        }
    }

    /// The field this spec writes
    pub fn field(&self) -> &str {
        match self {
            PopulateSpec::Reference { field, .. } | PopulateSpec::Children { field, .. } => field,
        }
    }
}

/// Executes listing requests against a document store
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn DocumentStore>,
    options: QueryOptions,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn DocumentStore>, options: QueryOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Parse a raw query string with this engine's paging limits
    pub fn parse(&self, raw: &RawQuery) -> ListQuery {
        ListQuery::parse(raw, &self.options)
    }

    /// Parse and run a listing request
    pub async fn build_and_execute(
        &self,
        raw: &RawQuery,
        collection: &str,
        populate: &[PopulateSpec],
    ) -> StoreResult<ResultEnvelope> {
        self.execute(self.parse(raw), collection, populate).await
    }

    /// Run an already parsed listing request
    ///
    /// Relation fields left out by the projection are not populated.
    pub async fn execute(
        &self,
        query: ListQuery,
        collection: &str,
        populate: &[PopulateSpec],
    ) -> StoreResult<ResultEnvelope> {
        let total = self.store.count(collection, &query.filter).await?;

        tracing::debug!(
            collection,
            clauses = query.filter.clauses().len(),
            page = query.window.page,
            limit = query.window.limit,
            total,
            "executing list query"
        );

        let populate: Vec<PopulateSpec> = populate
            .iter()
            .filter(|spec| query.projection.includes(spec.field()))
            .cloned()
            .collect();

        let window = query.window;
        let options = FindOptions::new(query.filter)
            .with_sort(query.sort)
            .with_projection(query.projection)
            .with_window(window);

        let documents = self.store.find(collection, &options).await?;
        let documents = self.populate(documents, &populate).await?;

        Ok(ResultEnvelope::new(
            documents,
            PaginationMeta::new(window, total),
        ))
    }

    /// Expand relation fields of already fetched documents
    pub async fn populate(
        &self,
        mut documents: Vec<Document>,
        populate: &[PopulateSpec],
    ) -> StoreResult<Vec<Document>> {
        for spec in populate {
            match spec {
                PopulateSpec::Reference {
                    field,
                    collection,
                    projection,
                } => {
                    self.populate_reference(&mut documents, field, collection, projection)
                        .await?
                }
                PopulateSpec::Children {
                    field,
                    collection,
                    foreign_field,
                    projection,
                } => {
                    self.populate_children(
                        &mut documents,
                        field,
                        collection,
                        foreign_field,
                        projection,
                    )
                    .await?
                }
            }
        }
        Ok(documents)
    }

    async fn populate_reference(
        &self,
        documents: &mut [Document],
        field: &str,
        collection: &str,
        projection: &Projection,
    ) -> StoreResult<()> {
        let keys: Vec<QueryValue> = documents
            .iter()
            .filter_map(|d| d.get(field).and_then(Value::as_str))
            .map(QueryValue::parse)
            .collect();
        if keys.is_empty() {
            return Ok(());
        }

        let options = FindOptions::new(FilterExpression::new().and(ID_FIELD, Predicate::In(keys)))
            .with_projection(projection.clone());
        let referenced: HashMap<String, Document> = self
            .store
            .find(collection, &options)
            .await?
            .into_iter()
            .filter_map(|d| document_id(&d).map(str::to_string).map(|id| (id, d)))
            .collect();

        for document in documents.iter_mut() {
            let Some(key) = document.get(field).and_then(Value::as_str) else {
                continue;
            };
            let expanded = referenced
                .get(key)
                .cloned()
                .map(Value::Object)
                .unwrap_or(Value::Null);
            document.insert(field.to_string(), expanded);
        }
        Ok(())
    }

    async fn populate_children(
        &self,
        documents: &mut [Document],
        field: &str,
        collection: &str,
        foreign_field: &str,
        projection: &Projection,
    ) -> StoreResult<()> {
        let parents: Vec<QueryValue> = documents
            .iter()
            .filter_map(document_id)
            .map(QueryValue::parse)
            .collect();
        if parents.is_empty() {
            return Ok(());
        }

        let options = FindOptions::new(
            FilterExpression::new().and(foreign_field, Predicate::In(parents)),
        )
        .with_sort(SortSpec::default_order())
        .with_projection(projection.clone());
        let children = self.store.find(collection, &options).await?;

        let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
        for child in children {
            if let Some(parent) = child.get(foreign_field).and_then(Value::as_str) {
                grouped
                    .entry(parent.to_string())
                    .or_default()
                    .push(Value::Object(child));
            }
        }

        for document in documents.iter_mut() {
            let items = document_id(document)
                .and_then(|id| grouped.remove(id))
                .unwrap_or_default();
            document.insert(field.to_string(), Value::Array(items));
        }
        Ok(())
    }
}
