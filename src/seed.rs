//! Bulk import and removal of the DevCamper collections
//!
//! `import_dir` reads any of `users.json`, `bootcamps.json`, `courses.json`
//! and `reviews.json` (each a JSON array of records in wire format) and stores
//! them through the same validation as the API. Plaintext passwords are
//! hashed, bootcamp addresses geocoded and bootcamp aggregates recomputed.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

use crate::core::entity::Entity;
use crate::core::password::hash_password;
use crate::core::query::{CREATED_AT_FIELD, FilterExpression, ID_FIELD};
use crate::core::service::from_document;
use crate::core::store::Document;
use crate::core::timestamp;
use crate::entities::bootcamps::handlers::geocode;
use crate::entities::courses::AVERAGE_COST;
use crate::entities::reviews::AVERAGE_RATING;
use crate::entities::{Bootcamp, Course, Review, User};
use crate::server::AppState;

const ARGON2_PREFIX: &str = "$argon2";

/// Number of records per collection touched by a seed operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: u64,
    pub bootcamps: u64,
    pub courses: u64,
    pub reviews: u64,
}

async fn read_records(dir: &Path, collection: &str) -> Result<Vec<Document>> {
    let path = dir.join(format!("{}.json", collection));
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Ok(Vec::new());
    }
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Assign an id and creation time to records that lack them
fn with_defaults(mut record: Document) -> Document {
    record
        .entry(ID_FIELD)
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    record
        .entry(CREATED_AT_FIELD)
        .or_insert_with(|| Value::String(timestamp::format(&timestamp::now())));
    record
}

async fn import_users(state: &AppState, records: Vec<Document>) -> Result<u64> {
    let users = state.service::<User>();
    let mut imported = 0;
    for record in records {
        let mut user: User = from_document(with_defaults(record))?;
        if !user.password.starts_with(ARGON2_PREFIX) {
            user.password = hash_password(&user.password)?;
        }
        users
            .create(user)
            .await
            .context("Failed to import user")?;
        imported += 1;
    }
    Ok(imported)
}

async fn import_bootcamps(state: &AppState, records: Vec<Document>) -> Result<u64> {
    let bootcamps = state.service::<Bootcamp>();
    let mut imported = 0;
    for record in records {
        let mut bootcamp: Bootcamp = from_document(with_defaults(record))?;
        bootcamp.refresh_slug();
        geocode(state, &mut bootcamp).await;
        bootcamps
            .create(bootcamp)
            .await
            .context("Failed to import bootcamp")?;
        imported += 1;
    }
    Ok(imported)
}

async fn import_children<E: Entity>(state: &AppState, records: Vec<Document>) -> Result<u64> {
    let service = state.service::<E>();
    let mut imported = 0;
    for record in records {
        let entity: E = from_document(with_defaults(record))?;
        service
            .create(entity)
            .await
            .with_context(|| format!("Failed to import {}", E::resource_name_singular()))?;
        imported += 1;
    }
    Ok(imported)
}

/// Import every seed file found in `dir`
pub async fn import_dir(state: &AppState, dir: &Path) -> Result<SeedReport> {
    let report = SeedReport {
        users: import_users(state, read_records(dir, User::resource_name()).await?).await?,
        bootcamps: import_bootcamps(state, read_records(dir, Bootcamp::resource_name()).await?)
            .await?,
        courses: import_children::<Course>(state, read_records(dir, Course::resource_name()).await?)
            .await?,
        reviews: import_children::<Review>(state, read_records(dir, Review::resource_name()).await?)
            .await?,
    };

    for bootcamp in state
        .service::<Bootcamp>()
        .find_where(FilterExpression::new())
        .await?
    {
        state.aggregates.recompute(&AVERAGE_COST, &bootcamp.id).await?;
        state.aggregates.recompute(&AVERAGE_RATING, &bootcamp.id).await?;
    }

    tracing::info!(?report, dir = %dir.display(), "data imported");
    Ok(report)
}

/// Delete every record of every collection
pub async fn destroy(state: &AppState) -> Result<SeedReport> {
    let everything = FilterExpression::new();
    let report = SeedReport {
        reviews: state.service::<Review>().delete_where(&everything).await?,
        courses: state.service::<Course>().delete_where(&everything).await?,
        bootcamps: state.service::<Bootcamp>().delete_where(&everything).await?,
        users: state.service::<User>().delete_where(&everything).await?,
    };
    tracing::info!(?report, "data destroyed");
    Ok(report)
}
