//! Derived aggregate fields
//!
//! A parent record caches a statistic over its children (a bootcamp's
//! average course tuition, its average review rating). Handlers call
//! [`Aggregates::recompute`] after every child write. Recomputes for the same
//! parent are serialized, and the children are read under the lock, so the
//! last recompute to finish reflects every committed child. Only the target
//! field is written, so concurrent edits of other parent fields survive.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::core::query::{FilterExpression, Projection, SortSpec};
use crate::core::store::{Document, DocumentStore, FindOptions, StoreError, StoreResult};

/// How the mean is stored on the parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Stored as-is
    Exact,
    /// Rounded up to the nearest multiple of ten, stored as an integer
    UpToTen,
}

impl Rounding {
    fn apply(self, mean: f64) -> Value {
        match self {
            Rounding::Exact => serde_json::Number::from_f64(mean)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Rounding::UpToTen => Value::from(((mean / 10.0).ceil() * 10.0) as i64),
        }
    }
}

/// Mean of a child field stored on the parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateSpec {
    pub parent_collection: &'static str,
    pub child_collection: &'static str,
    /// Child field holding the parent id
    pub foreign_field: &'static str,
    /// Child field averaged
    pub source_field: &'static str,
    /// Parent field written
    pub target_field: &'static str,
    pub rounding: Rounding,
}

/// Mean of the numeric values, `None` when there are none
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Recomputes aggregates with one async lock per parent record
#[derive(Clone)]
pub struct Aggregates {
    store: Arc<dyn DocumentStore>,
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl Aggregates {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock_map(
        &self,
    ) -> StoreResult<std::sync::MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>>> {
        self.locks
            .lock()
            .map_err(|e| StoreError::backend("aggregates", format!("lock poisoned: {}", e)))
    }

    fn lock_for(&self, parent_id: &str) -> StoreResult<Arc<tokio::sync::Mutex<()>>> {
        Ok(self
            .lock_map()?
            .entry(parent_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone())
    }

    /// Drop the parent's lock once no other recompute holds or awaits it
    fn release(&self, parent_id: &str, lock: Arc<tokio::sync::Mutex<()>>) -> StoreResult<()> {
        let mut locks = self.lock_map()?;
        // the map and `lock` are the only owners left
        if Arc::strong_count(&lock) == 2 {
            locks.remove(parent_id);
        }
        Ok(())
    }

    #[cfg(test)]
    fn tracked_parents(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    /// Recompute one aggregate of a parent
    ///
    /// Writes `null` when no children remain. Returns the stored value, or
    /// `None` when the parent no longer exists.
    pub async fn recompute(
        &self,
        spec: &AggregateSpec,
        parent_id: &str,
    ) -> StoreResult<Option<Value>> {
        let lock = self.lock_for(parent_id)?;
        let result = {
            let _guard = lock.lock().await;
            self.recompute_locked(spec, parent_id).await
        };
        self.release(parent_id, lock)?;
        result
    }

    async fn recompute_locked(
        &self,
        spec: &AggregateSpec,
        parent_id: &str,
    ) -> StoreResult<Option<Value>> {
        let options = FindOptions::new(
            FilterExpression::new().with_eq(spec.foreign_field, parent_id),
        )
        .with_sort(SortSpec::default_order())
        .with_projection(Projection::fields([spec.source_field]));

        let values: Vec<f64> = self
            .store
            .find(spec.child_collection, &options)
            .await?
            .iter()
            .filter_map(|child| child.get(spec.source_field).and_then(Value::as_f64))
            .collect();

        let aggregate = mean(&values)
            .map(|m| spec.rounding.apply(m))
            .unwrap_or(Value::Null);

        let mut fields = Document::new();
        fields.insert(spec.target_field.to_string(), aggregate.clone());
        if self
            .store
            .set_fields(spec.parent_collection, parent_id, fields, &[])
            .await?
            .is_none()
        {
            return Ok(None);
        }

        tracing::debug!(
            parent = parent_id,
            field = spec.target_field,
            children = values.len(),
            value = %aggregate,
            "recomputed aggregate"
        );
        Ok(Some(aggregate))
    }
}
