// SQLite persistence for users and their saved colors and palettes.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::color::{Color, Palette};

/// Per-user counts shown by the stats command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserStats {
    pub favorite_colors: usize,
    pub favorite_palettes: usize,
}

/// A palette the user saved under a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPalette {
    pub name: String,
    pub colors: Vec<Color>,
}

/// Storage for per-user favorite colors and saved palettes.
pub trait FavoriteStore: Send + Sync {
    /// Save `color` for `user_id`. Returns `true` if it was newly added and
    /// `false` if the user had already saved it.
    fn add_favorite(&self, user_id: i64, color: &Color) -> Result<bool>;

    /// Saved colors, newest first.
    fn list_favorites(&self, user_id: i64) -> Result<Vec<Color>>;

    /// Remove every saved color and palette for the user. Clearing an empty
    /// set succeeds.
    fn clear_favorites(&self, user_id: i64) -> Result<bool>;

    /// Save `palette` under `name`. Saving the same palette twice keeps both.
    fn add_favorite_palette(&self, user_id: i64, name: &str, palette: &Palette) -> Result<()>;

    /// Saved palettes, newest first.
    fn list_favorite_palettes(&self, user_id: i64) -> Result<Vec<SavedPalette>>;

    fn stats(&self, user_id: i64) -> Result<UserStats>;
}

/// SQLite-backed store for users, favorite colors, and favorite palettes.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                user_id    INTEGER PRIMARY KEY,
                username   TEXT,
                first_name TEXT,
                joined_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS favorite_colors (
                id       INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id  INTEGER NOT NULL,
                hex_code TEXT NOT NULL,
                added_at TEXT NOT NULL,
                UNIQUE(user_id, hex_code)
            );

            CREATE TABLE IF NOT EXISTS favorite_palettes (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id      INTEGER NOT NULL,
                palette_name TEXT NOT NULL,
                colors       TEXT NOT NULL,
                added_at     TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_favorite_palettes_user
                ON favorite_palettes(user_id);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }

    /// Record a user the first time they show up. Later calls refresh the
    /// display names but keep the original join time.
    pub fn register_user(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (user_id, username, first_name, joined_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                username   = excluded.username,
                first_name = excluded.first_name",
            params![user_id, username, first_name, Self::now()],
        )
        .context("failed to register user")?;
        Ok(())
    }

    /// When the user was first seen, if ever.
    pub fn joined_at(&self, user_id: i64) -> Result<Option<String>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT joined_at FROM users WHERE user_id = ?1")
            .context("failed to prepare joined_at query")?;
        let mut rows = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))
            .context("failed to query users")?;
        let joined = rows.next().transpose().context("failed to read user row")?;
        Ok(joined)
    }

    fn count(&self, sql: &str, user_id: i64) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row(sql, params![user_id], |row| row.get(0))
            .with_context(|| format!("failed to run count query: {sql}"))?;
        Ok(count as usize)
    }
}

impl FavoriteStore for Database {
    /// Uses INSERT OR IGNORE against the `(user_id, hex_code)` uniqueness
    /// constraint; the affected-row count tells a new save from a repeat.
    fn add_favorite(&self, user_id: i64, color: &Color) -> Result<bool> {
        let conn = self.conn();
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO favorite_colors (user_id, hex_code, added_at)
                 VALUES (?1, ?2, ?3)",
                params![user_id, color.hex(), Self::now()],
            )
            .context("failed to add favorite color")?;
        Ok(inserted == 1)
    }

    fn list_favorites(&self, user_id: i64) -> Result<Vec<Color>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT hex_code FROM favorite_colors WHERE user_id = ?1 ORDER BY id DESC")
            .context("failed to prepare list_favorites query")?;

        let hexes = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))
            .context("failed to query favorite colors")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map favorite color rows")?;

        Ok(hexes.iter().filter_map(|hex| Color::parse(hex).ok()).collect())
    }

    /// Deletes colors and palettes in one transaction with automatic
    /// rollback on error.
    fn clear_favorites(&self, user_id: i64) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        tx.execute("DELETE FROM favorite_colors WHERE user_id = ?1", params![user_id])
            .context("failed to delete favorite colors")?;
        tx.execute("DELETE FROM favorite_palettes WHERE user_id = ?1", params![user_id])
            .context("failed to delete favorite palettes")?;
        tx.commit().context("failed to commit clear_favorites")?;
        Ok(true)
    }

    /// Save a named palette. Palettes aren't deduplicated.
    fn add_favorite_palette(&self, user_id: i64, name: &str, palette: &Palette) -> Result<()> {
        let conn = self.conn();
        let colors = palette
            .colors()
            .iter()
            .map(Color::hex)
            .collect::<Vec<_>>()
            .join(",");
        conn.execute(
            "INSERT INTO favorite_palettes (user_id, palette_name, colors, added_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, name, colors, Self::now()],
        )
        .context("failed to save favorite palette")?;
        Ok(())
    }

    /// Saved palettes, newest first. Stored colors that no longer parse are
    /// dropped from the returned palette.
    fn list_favorite_palettes(&self, user_id: i64) -> Result<Vec<SavedPalette>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT palette_name, colors FROM favorite_palettes
                 WHERE user_id = ?1 ORDER BY id DESC",
            )
            .context("failed to prepare list_favorite_palettes query")?;

        let palettes = stmt
            .query_map(params![user_id], |row| {
                let name: String = row.get(0)?;
                let joined: String = row.get(1)?;
                let colors = joined
                    .split(',')
                    .filter_map(|hex| Color::parse(hex).ok())
                    .collect();
                Ok(SavedPalette { name, colors })
            })
            .context("failed to query favorite palettes")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map favorite palette rows")?;

        Ok(palettes)
    }

    fn stats(&self, user_id: i64) -> Result<UserStats> {
        Ok(UserStats {
            favorite_colors: self.count(
                "SELECT COUNT(*) FROM favorite_colors WHERE user_id = ?1",
                user_id,
            )?,
            favorite_palettes: self.count(
                "SELECT COUNT(*) FROM favorite_palettes WHERE user_id = ?1",
                user_id,
            )?,
        })
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
