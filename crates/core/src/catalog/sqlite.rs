//! SQLite-backed comic catalog implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, params_from_iter, Connection};

use super::{CatalogError, CatalogStats, Comic, ComicCatalog, ComicRef};

/// SQLite-backed comic catalog.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Open a catalog at the given path, creating the database file and
    /// tables if needed.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path).map_err(|e| CatalogError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory catalog (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CatalogError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- One row per comic
            CREATE TABLE IF NOT EXISTS comics (
                id  INTEGER PRIMARY KEY,
                url TEXT NOT NULL
            );

            -- Keywords of a comic, one row per (comic, position)
            CREATE TABLE IF NOT EXISTS comic_words (
                comic_id INTEGER NOT NULL REFERENCES comics(id) ON DELETE CASCADE,
                pos      INTEGER NOT NULL,
                word     TEXT NOT NULL,
                PRIMARY KEY (comic_id, pos)
            );

            CREATE INDEX IF NOT EXISTS idx_comic_words_word ON comic_words(word);

            -- Exactly one aggregate row, seeded zeroed
            CREATE TABLE IF NOT EXISTS comics_stats (
                comics_fetched INTEGER NOT NULL,
                words_total    INTEGER NOT NULL,
                words_unique   INTEGER NOT NULL
            );

            INSERT INTO comics_stats (comics_fetched, words_total, words_unique)
            SELECT 0, 0, 0
            WHERE NOT EXISTS (SELECT 1 FROM comics_stats);
            "#,
        )
        .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(())
    }

    /// Load the keyword list of one comic, in insertion order.
    fn load_words(conn: &Connection, comic_id: i64) -> Result<Vec<String>, CatalogError> {
        let mut stmt = conn
            .prepare("SELECT word FROM comic_words WHERE comic_id = ? ORDER BY pos")
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![comic_id], |row| row.get::<_, String>(0))
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let mut words = Vec::new();
        for row in rows {
            words.push(row.map_err(|e| CatalogError::Database(e.to_string()))?);
        }
        Ok(words)
    }
}

impl ComicCatalog for SqliteCatalog {
    fn add(&self, comics: &[Comic]) -> Result<(), CatalogError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        {
            let mut insert_comic = tx
                .prepare("INSERT INTO comics (id, url) VALUES (?1, ?2)")
                .map_err(|e| CatalogError::Database(e.to_string()))?;
            let mut insert_word = tx
                .prepare("INSERT INTO comic_words (comic_id, pos, word) VALUES (?1, ?2, ?3)")
                .map_err(|e| CatalogError::Database(e.to_string()))?;

            for comic in comics {
                insert_comic
                    .execute(params![comic.id, comic.url])
                    .map_err(|e| CatalogError::Database(e.to_string()))?;
                for (pos, word) in comic.words.iter().enumerate() {
                    insert_word
                        .execute(params![comic.id, pos as i64, word])
                        .map_err(|e| CatalogError::Database(e.to_string()))?;
                }
            }

            // Recompute the aggregate from the live tables inside the same
            // transaction, so the stats row always matches the catalog.
            tx.execute(
                "UPDATE comics_stats SET
                    comics_fetched = (SELECT COUNT(*) FROM comics),
                    words_total    = (SELECT COUNT(*) FROM comic_words),
                    words_unique   = (SELECT COUNT(DISTINCT word) FROM comic_words)",
                [],
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;
        }

        tx.commit()
            .map_err(|e| CatalogError::Database(e.to_string()))?;
        Ok(())
    }

    fn ids(&self) -> Result<Vec<i64>, CatalogError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id FROM comics")
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.map_err(|e| CatalogError::Database(e.to_string()))?);
        }
        Ok(ids)
    }

    fn all_comics(&self) -> Result<Vec<Comic>, CatalogError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, url FROM comics ORDER BY id")
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let mut comics = Vec::new();
        for row in rows {
            let (id, url) = row.map_err(|e| CatalogError::Database(e.to_string()))?;
            let words = Self::load_words(&conn, id)?;
            comics.push(Comic { id, url, words });
        }
        Ok(comics)
    }

    fn comics_by_ids(&self, ids: &[i64]) -> Result<Vec<ComicRef>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock().unwrap();
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT id, url FROM comics WHERE id IN ({placeholders})");
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params_from_iter(ids.iter()), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let mut found: HashMap<i64, String> = HashMap::new();
        for row in rows {
            let (id, url) = row.map_err(|e| CatalogError::Database(e.to_string()))?;
            found.insert(id, url);
        }

        // Preserve the caller's id order; missing ids are simply absent.
        Ok(ids
            .iter()
            .filter_map(|id| found.remove(id).map(|url| ComicRef { id: *id, url }))
            .collect())
    }

    fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT comics_fetched, words_total, words_unique FROM comics_stats",
            [],
            |row| {
                Ok(CatalogStats {
                    comics_fetched: row.get(0)?,
                    words_total: row.get(1)?,
                    words_unique: row.get(2)?,
                })
            },
        )
        .map_err(|e| CatalogError::Database(e.to_string()))
    }

    fn drop_all(&self) -> Result<(), CatalogError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        tx.execute_batch(
            "DELETE FROM comic_words;
             DELETE FROM comics;
             UPDATE comics_stats SET comics_fetched = 0, words_total = 0, words_unique = 0;",
        )
        .map_err(|e| CatalogError::Database(e.to_string()))?;

        tx.commit()
            .map_err(|e| CatalogError::Database(e.to_string()))?;
        Ok(())
    }

    fn ping(&self) -> Result<(), CatalogError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .map_err(|e| CatalogError::Database(e.to_string()))
    }
}
