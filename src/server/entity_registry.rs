//! Entity registry collecting the routes of every resource

use axum::Router;
use indexmap::IndexMap;

use crate::server::AppState;

/// Trait that describes how to build routes for a resource
///
/// Each resource (bootcamps, courses, ...) implements this trait to provide
/// its routes, relative to the API prefix.
pub trait EntityDescriptor: Send + Sync {
    /// The entity type name (singular, e.g. "bootcamp")
    fn entity_type(&self) -> &str;

    /// Build the routes for this resource
    fn build_routes(&self, state: AppState) -> Router;
}

/// Registry for all resources of the application
#[derive(Default)]
pub struct EntityRegistry {
    descriptors: IndexMap<String, Box<dyn EntityDescriptor>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity descriptor
    ///
    /// The entity type name is the key; registering it again replaces it.
    pub fn register(&mut self, descriptor: Box<dyn EntityDescriptor>) {
        let entity_type = descriptor.entity_type().to_string();
        self.descriptors.insert(entity_type, descriptor);
    }

    /// Merge the routes of every registered resource
    pub fn build_routes(&self, state: &AppState) -> Router {
        self.descriptors
            .values()
            .fold(Router::new(), |router, descriptor| {
                router.merge(descriptor.build_routes(state.clone()))
            })
    }

    /// Get all registered entity types, in registration order
    pub fn entity_types(&self) -> Vec<&str> {
        self.descriptors.keys().map(|s| s.as_str()).collect()
    }
}
