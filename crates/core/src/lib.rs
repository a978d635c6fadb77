pub mod auth;
pub mod catalog;
pub mod config;
pub mod events;
pub mod searcher;
pub mod testing;
pub mod updater;
pub mod words;
pub mod xkcd;

pub use auth::{AuthError, JwtAuthenticator};
pub use catalog::{CatalogError, CatalogStats, Comic, ComicCatalog, ComicRef, SqliteCatalog};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use events::{Event, EventBus, EventHandler, EventPublisher, PublishError};
pub use searcher::{IndexScheduler, SearchError, SearchService};
pub use updater::{ServiceStats, UpdateError, UpdateService, UpdateStatus};
pub use words::{Normalizer, SnowballNormalizer, WordsError};
pub use xkcd::{ComicSource, XkcdClient, XkcdError, XkcdInfo};
