//! # DevCamper
//!
//! A bootcamp directory REST API built around a generic list-query engine.
//!
//! ## Features
//!
//! - **List-query engine**: filters (`tuition[gte]=1000`, `careers[in]=UI/UX`),
//!   field selection, multi-key sorting and pagination for every listing
//! - **Relation population**: references and child collections expanded in
//!   listing results
//! - **Derived aggregates**: average course cost and review rating kept on
//!   the bootcamp
//! - **Auth**: JWT bearer tokens or session cookie, role and ownership checks
//! - **Pluggable storage**: in-memory store, MongoDB behind `mongodb_backend`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use devcamper::prelude::*;
//!
//! let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
//! let state = AppState::new(store, AppConfig::default());
//! ensure_indexes(&state).await?;
//!
//! register_resources(ServerBuilder::new(state))
//!     .serve("127.0.0.1:5000")
//!     .await?;
//! ```
//!
//! ```text
//! GET /api/v1/bootcamps?careers[in]=Business&select=name,averageCost&sort=-averageCost&limit=5
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod seed;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        aggregate::{AggregateSpec, Aggregates, Rounding},
        auth::{AuthContext, AuthPolicy, AuthProvider, Role},
        engine::{PopulateSpec, QueryEngine},
        entity::Entity,
        error::ApiError,
        geo::{Geocoder, Location, StaticGeocoder},
        mailer::{Email, LogMailer, Mailer},
        query::{FilterExpression, ListQuery, Projection, RawQuery, ResultEnvelope, SortSpec},
        service::EntityService,
        store::{Document, DocumentStore, FindOptions, StoreError},
    };

    // === Resources ===
    pub use crate::entities::{
        Bootcamp, Course, Review, User, ensure_indexes, register_resources,
    };

    // === Storage ===
    pub use crate::storage::InMemoryStore;
    #[cfg(feature = "mongodb_backend")]
    pub use crate::storage::MongoStore;

    // === Config ===
    pub use crate::config::AppConfig;

    // === Server ===
    pub use crate::server::{AppState, EntityDescriptor, EntityRegistry, ServerBuilder};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
}
