//! Shared application state handed to every handler

use chrono::Duration;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::aggregate::Aggregates;
use crate::core::auth::AuthProvider;
use crate::core::engine::QueryEngine;
use crate::core::entity::Entity;
use crate::core::geo::{Geocoder, StaticGeocoder};
use crate::core::mailer::{LogMailer, Mailer};
use crate::core::service::EntityService;
use crate::core::store::DocumentStore;
use crate::core::token::JwtManager;
use crate::entities::auth::JwtAuthProvider;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub engine: QueryEngine,
    pub aggregates: Aggregates,
    pub tokens: JwtManager,
    pub auth: Arc<dyn AuthProvider>,
    pub geocoder: Arc<dyn Geocoder>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire every collaborator from configuration
    ///
    /// Geocoding uses the configured zipcode table and email is only logged;
    /// override either with `with_geocoder` / `with_mailer`.
    pub fn new(store: Arc<dyn DocumentStore>, config: AppConfig) -> Self {
        let tokens = JwtManager::new(
            &config.auth.jwt_secret,
            Duration::days(config.auth.jwt_expire_days),
        );
        let auth = Arc::new(JwtAuthProvider::new(tokens.clone(), store.clone()));

        Self {
            engine: QueryEngine::new(store.clone(), config.query.options()),
            aggregates: Aggregates::new(store.clone()),
            geocoder: Arc::new(StaticGeocoder::new(config.geocoder.zipcodes.clone())),
            mailer: Arc::new(LogMailer),
            config: Arc::new(config),
            tokens,
            auth,
            store,
        }
    }

    pub fn with_geocoder(mut self, geocoder: impl Geocoder + 'static) -> Self {
        self.geocoder = Arc::new(geocoder);
        self
    }

    pub fn with_mailer(mut self, mailer: impl Mailer + 'static) -> Self {
        self.mailer = Arc::new(mailer);
        self
    }

    pub fn service<E: Entity>(&self) -> EntityService<E> {
        EntityService::new(self.store.clone())
    }
}
