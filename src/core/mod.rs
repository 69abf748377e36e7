//! Core module: the list-query engine, the store abstraction and the
//! collaborators shared by every resource

pub mod aggregate;
pub mod auth;
pub mod engine;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod geo;
pub mod mailer;
pub mod password;
pub mod query;
pub mod service;
pub mod store;
pub mod timestamp;
pub mod token;

pub use aggregate::{AggregateSpec, Aggregates, Rounding};
pub use auth::{AuthContext, AuthPolicy, AuthProvider, Role};
pub use engine::{PopulateSpec, QueryEngine};
pub use entity::Entity;
pub use error::ApiError;
pub use query::{FilterExpression, ListQuery, Projection, RawQuery, ResultEnvelope, SortSpec};
pub use service::EntityService;
pub use store::{Document, DocumentStore, FindOptions, StoreError};
