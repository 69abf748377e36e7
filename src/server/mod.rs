//! HTTP server: shared state, route registry and builder
//!
//! Each resource registers its routes through an [`EntityDescriptor`]; the
//! [`ServerBuilder`] mounts them under `/api/v1` with the health check.

pub mod builder;
pub mod entity_registry;
pub mod response;
pub mod state;

pub use builder::{API_PREFIX, ServerBuilder};
pub use entity_registry::{EntityDescriptor, EntityRegistry};
pub use response::{CountedResponse, DataResponse, TokenResponse};
pub use state::AppState;
