use std::sync::Arc;

use comicsearch_core::{
    Config, ComicCatalog, JwtAuthenticator, Normalizer, SanitizedConfig, SearchService,
    UpdateService,
};

/// Shared application state.
pub struct AppState {
    config: Config,
    authenticator: JwtAuthenticator,
    updater: Arc<UpdateService>,
    searcher: Arc<SearchService>,
    words: Arc<dyn Normalizer>,
    catalog: Arc<dyn ComicCatalog>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: JwtAuthenticator,
        updater: Arc<UpdateService>,
        searcher: Arc<SearchService>,
        words: Arc<dyn Normalizer>,
        catalog: Arc<dyn ComicCatalog>,
    ) -> Self {
        Self {
            config,
            authenticator,
            updater,
            searcher,
            words,
            catalog,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &JwtAuthenticator {
        &self.authenticator
    }

    pub fn updater(&self) -> &UpdateService {
        &self.updater
    }

    pub fn searcher(&self) -> &SearchService {
        &self.searcher
    }

    pub fn words(&self) -> &dyn Normalizer {
        self.words.as_ref()
    }

    pub fn catalog(&self) -> &dyn ComicCatalog {
        self.catalog.as_ref()
    }
}
