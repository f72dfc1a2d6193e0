use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::ConfigPaths;
use crate::entry::{normalize_tech, Entry};

mod schema;

const TECH_JOIN: &str = ", ";

/// Store failures the UI and CLI need to tell apart: a missing entry renders
/// differently from a broken database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entry {id} not found")]
    NotFound { id: String },
    #[error("entry title cannot be empty")]
    EmptyTitle,
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// User-supplied fields of an entry, as submitted from a form or the CLI.
/// The store owns everything else.
#[derive(Debug, Clone, Default)]
pub struct EntryFields {
    pub date: String,
    pub title: String,
    pub problem: String,
    pub tech: Vec<String>,
    pub notes: String,
    pub code: String,
}

/// Cheap-to-clone handle on the SQLite entry store. Every operation is scoped
/// to the profile the handle was opened with.
#[derive(Clone)]
pub struct EntryStore {
    db_path: Arc<PathBuf>,
    profile: Arc<String>,
}

impl EntryStore {
    pub fn connect(&self) -> StoreResult<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// All entries for this profile, newest date first. Ties on the date
    /// string fall back to creation time then id so the order is total and
    /// stable across calls.
    pub fn list_entries(&self, limit: Option<usize>) -> StoreResult<Vec<Entry>> {
        self.with_connection(|conn| {
            let mut sql = String::from(
                "SELECT id, date, title, problem, tech, notes, code, created_at, updated_at
                 FROM entries
                 WHERE profile = ?1
                 ORDER BY date DESC, created_at DESC, id",
            );
            if limit.is_some() {
                sql.push_str(" LIMIT ?2");
            }
            let mut stmt = conn.prepare(&sql)?;
            let entries = match limit {
                Some(limit) => stmt
                    .query_map(params![&*self.profile, limit as i64], row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()?,
                None => stmt
                    .query_map(params![&*self.profile], row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()?,
            };
            Ok(entries)
        })
    }

    pub fn get_entry(&self, id: &str) -> StoreResult<Entry> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, date, title, problem, tech, notes, code, created_at, updated_at
                 FROM entries
                 WHERE profile = ?1 AND id = ?2",
            )?;
            stmt.query_row(params![&*self.profile, id], row_to_entry)
                .optional()?
                .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
        })
    }

    /// Inserts a new entry, assigning the id and both timestamps.
    pub fn create_entry(&self, fields: &EntryFields) -> StoreResult<Entry> {
        let title = fields.title.trim();
        if title.is_empty() {
            return Err(StoreError::EmptyTitle);
        }
        let id = Uuid::new_v4().to_string();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let tech = join_tech(&fields.tech);
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO entries (id, profile, date, title, problem, tech, notes, code, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                params![
                    id,
                    &*self.profile,
                    fields.date.trim(),
                    title,
                    fields.problem,
                    tech,
                    fields.notes,
                    fields.code,
                    now
                ],
            )
            .context("inserting entry")?;
            Ok(())
        })?;
        self.get_entry(&id)
    }

    /// Rewrites every user field of an existing entry and refreshes
    /// `updated_at`. `created_at` is untouched.
    pub fn update_entry(&self, id: &str, fields: &EntryFields) -> StoreResult<Entry> {
        let title = fields.title.trim();
        if title.is_empty() {
            return Err(StoreError::EmptyTitle);
        }
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let tech = join_tech(&fields.tech);
        self.with_connection(|conn| {
            let updated = conn
                .execute(
                    "UPDATE entries
                     SET date = ?1, title = ?2, problem = ?3, tech = ?4, notes = ?5, code = ?6, updated_at = ?7
                     WHERE profile = ?8 AND id = ?9",
                    params![
                        fields.date.trim(),
                        title,
                        fields.problem,
                        tech,
                        fields.notes,
                        fields.code,
                        now,
                        &*self.profile,
                        id
                    ],
                )
                .context("updating entry")?;
            if updated == 0 {
                return Err(StoreError::NotFound { id: id.to_string() });
            }
            Ok(())
        })?;
        self.get_entry(id)
    }

    pub fn delete_entry(&self, id: &str) -> StoreResult<()> {
        self.with_connection(|conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM entries WHERE profile = ?1 AND id = ?2",
                    params![&*self.profile, id],
                )
                .context("deleting entry")?;
            if deleted == 0 {
                return Err(StoreError::NotFound { id: id.to_string() });
            }
            Ok(())
        })
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let tech: String = row.get(4)?;
    Ok(Entry {
        id: row.get(0)?,
        date: row.get(1)?,
        title: row.get(2)?,
        problem: row.get(3)?,
        // legacy rows may carry stray whitespace or empty segments
        tech: normalize_tech(&tech),
        notes: row.get(5)?,
        code: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn join_tech(tags: &[String]) -> String {
    crate::entry::normalize_tech_list(tags).join(TECH_JOIN)
}

pub fn init(paths: &ConfigPaths, profile: &str) -> StoreResult<EntryStore> {
    let db_path = &paths.database_path;
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn)?;
    schema::apply(&conn)?;
    Ok(EntryStore {
        db_path: Arc::new(db_path.clone()),
        profile: Arc::new(profile.to_string()),
    })
}

fn prepare_connection(conn: &Connection) -> StoreResult<()> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn temp_paths(root: &TempDir) -> ConfigPaths {
        let base = root.path();
        let config_dir = base.join("config");
        let data_dir = base.join("data");
        ConfigPaths {
            config_dir: config_dir.clone(),
            config_file: config_dir.join("config.toml"),
            data_dir: data_dir.clone(),
            database_path: data_dir.join("diary.db"),
        }
    }

    fn init_store() -> anyhow::Result<(TempDir, EntryStore)> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        let store = init(&paths, "tester")?;
        Ok((temp, store))
    }

    fn fields(title: &str, date: &str) -> EntryFields {
        EntryFields {
            date: date.to_string(),
            title: title.to_string(),
            problem: "it broke".to_string(),
            tech: vec!["rust".to_string()],
            notes: "some notes".to_string(),
            code: "fn main() {}".to_string(),
        }
    }

    #[test]
    fn create_assigns_id_and_timestamps() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        let entry = store.create_entry(&fields("First", "2024-06-01"))?;
        assert!(!entry.id.is_empty());
        assert!(entry.created_at > 0);
        assert_eq!(entry.created_at, entry.updated_at);
        assert_eq!(entry.title, "First");
        Ok(())
    }

    #[test]
    fn create_rejects_empty_title() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        let result = store.create_entry(&fields("   ", "2024-06-01"));
        assert_matches!(result, Err(StoreError::EmptyTitle));
        Ok(())
    }

    #[test]
    fn list_orders_by_date_descending() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        store.create_entry(&fields("Oldest", "2024-01-01"))?;
        store.create_entry(&fields("Newest", "2024-06-15"))?;
        store.create_entry(&fields("Middle", "2024-03-10"))?;

        let titles: Vec<_> = store
            .list_entries(None)?
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["Newest", "Middle", "Oldest"]);
        Ok(())
    }

    #[test]
    fn list_order_is_stable_across_calls() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        for i in 0..5 {
            store.create_entry(&fields(&format!("entry {i}"), "2024-06-01"))?;
        }
        let first: Vec<_> = store.list_entries(None)?.into_iter().map(|e| e.id).collect();
        let second: Vec<_> = store.list_entries(None)?.into_iter().map(|e| e.id).collect();
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn list_respects_limit() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        for i in 0..8 {
            store.create_entry(&fields(&format!("entry {i}"), &format!("2024-06-0{}", i + 1)))?;
        }
        assert_eq!(store.list_entries(Some(5))?.len(), 5);
        Ok(())
    }

    #[test]
    fn get_distinguishes_not_found() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        let entry = store.create_entry(&fields("Here", "2024-06-01"))?;
        assert_eq!(store.get_entry(&entry.id)?.title, "Here");
        assert_matches!(
            store.get_entry("no-such-id"),
            Err(StoreError::NotFound { ref id }) if id == "no-such-id"
        );
        Ok(())
    }

    #[test]
    fn update_rewrites_fields_and_refreshes_updated_at() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        let entry = store.create_entry(&fields("Before", "2024-06-01"))?;

        let mut changed = fields("After", "2024-06-02");
        changed.notes = "revised".to_string();
        let updated = store.update_entry(&entry.id, &changed)?;
        assert_eq!(updated.title, "After");
        assert_eq!(updated.date, "2024-06-02");
        assert_eq!(updated.notes, "revised");
        assert_eq!(updated.created_at, entry.created_at);
        assert!(updated.updated_at >= entry.updated_at);

        assert_matches!(
            store.update_entry("missing", &changed),
            Err(StoreError::NotFound { .. })
        );
        Ok(())
    }

    #[test]
    fn delete_removes_entry() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        let entry = store.create_entry(&fields("Doomed", "2024-06-01"))?;
        store.delete_entry(&entry.id)?;
        assert_matches!(
            store.get_entry(&entry.id),
            Err(StoreError::NotFound { .. })
        );
        assert_matches!(
            store.delete_entry(&entry.id),
            Err(StoreError::NotFound { .. })
        );
        Ok(())
    }

    #[test]
    fn tech_tags_normalize_on_write_and_read() -> anyhow::Result<()> {
        let (_temp, store) = init_store()?;
        let mut raw = fields("Tagged", "2024-06-01");
        raw.tech = vec![" Rust , tokio".to_string(), "".to_string(), "serde ".to_string()];
        let entry = store.create_entry(&raw)?;
        assert_eq!(entry.tech, vec!["Rust", "tokio", "serde"]);
        Ok(())
    }

    #[test]
    fn entries_are_scoped_to_profile() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        let alice = init(&paths, "alice")?;
        let bob = init(&paths, "bob")?;

        let entry = alice.create_entry(&fields("Private", "2024-06-01"))?;
        assert_eq!(alice.list_entries(None)?.len(), 1);
        assert!(bob.list_entries(None)?.is_empty());
        assert_matches!(
            bob.get_entry(&entry.id),
            Err(StoreError::NotFound { .. })
        );
        Ok(())
    }
}
