use std::sync::Arc;

use crate::practice_test::scoring::{PlaceholderScaler, ScoreScaler};
use crate::practice_test::templates::TestTemplates;
use crate::security::TokenVerifier;
use crate::store::Repositories;
use crate::taxonomy::Taxonomy;

pub struct AppState {
    pub repos: Repositories,
    pub taxonomy: Arc<Taxonomy>,
    pub templates: Arc<TestTemplates>,
    pub scaler: Arc<dyn ScoreScaler>,
    pub tokens: TokenVerifier,
}

impl AppState {
    pub fn new(repos: Repositories, taxonomy: Taxonomy, tokens: TokenVerifier) -> Self {
        Self {
            repos,
            taxonomy: Arc::new(taxonomy),
            templates: Arc::new(TestTemplates::default()),
            scaler: Arc::new(PlaceholderScaler),
            tokens,
        }
    }

    pub fn with_templates(mut self, templates: TestTemplates) -> Self {
        self.templates = Arc::new(templates);
        self
    }

    pub fn with_scaler(mut self, scaler: Arc<dyn ScoreScaler>) -> Self {
        self.scaler = scaler;
        self
    }

    /// In-memory store with the standard taxonomy.
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self::new(
            Repositories::in_memory(),
            Taxonomy::standard(),
            TokenVerifier::new(jwt_secret),
        )
    }
}
