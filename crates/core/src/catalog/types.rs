//! Types for the comic catalog.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One indexed comic of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comic {
    /// Stable numeric identifier.
    pub id: i64,
    /// Image location.
    pub url: String,
    /// Normalized keywords in first-occurrence order; may be empty.
    pub words: Vec<String>,
}

/// The `(id, url)` view of a comic returned by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComicRef {
    pub id: i64,
    pub url: String,
}

/// Aggregate catalog statistics, kept in a single row and recomputed
/// transactionally with every batch insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    /// Number of comics in the catalog.
    pub comics_fetched: i64,
    /// Sum of keyword list lengths across all comics.
    pub words_total: i64,
    /// Number of distinct keywords across all comics.
    pub words_unique: i64,
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comic_serialization_roundtrip() {
        let comic = Comic {
            id: 614,
            url: "https://imgs.xkcd.com/comics/woodpecker.png".to_string(),
            words: vec!["woodpeck".to_string(), "tree".to_string()],
        };
        let json = serde_json::to_string(&comic).unwrap();
        let parsed: Comic = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, comic);
    }

    #[test]
    fn test_stats_default_is_zeroed() {
        let stats = CatalogStats::default();
        assert_eq!(stats.comics_fetched, 0);
        assert_eq!(stats.words_total, 0);
        assert_eq!(stats.words_unique, 0);
    }
}
