//! Comic catalog storage.
//!
//! The catalog is the single persistent table of comics plus a one-row stats
//! aggregate. It is written only by the updater and read by everyone else.

mod sqlite;
mod types;

pub use sqlite::SqliteCatalog;
pub use types::*;

/// Trait for catalog storage.
pub trait ComicCatalog: Send + Sync {
    /// Insert a batch of comics and recompute the stats row, all in one
    /// transaction. Nothing is written if any insert fails.
    fn add(&self, comics: &[Comic]) -> Result<(), CatalogError>;

    /// All comic ids currently in the catalog.
    fn ids(&self) -> Result<Vec<i64>, CatalogError>;

    /// All comics with their keyword lists.
    fn all_comics(&self) -> Result<Vec<Comic>, CatalogError>;

    /// `(id, url)` rows for the given ids, in the order the ids were given.
    /// Ids without a row are silently absent from the result.
    fn comics_by_ids(&self, ids: &[i64]) -> Result<Vec<ComicRef>, CatalogError>;

    /// Read the stats row.
    fn stats(&self) -> Result<CatalogStats, CatalogError>;

    /// Remove every comic and zero the stats row, in one transaction.
    fn drop_all(&self) -> Result<(), CatalogError>;

    /// Cheap liveness probe against the underlying store.
    fn ping(&self) -> Result<(), CatalogError>;
}
