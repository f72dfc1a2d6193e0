use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn apply(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            id TEXT PRIMARY KEY,
            profile TEXT NOT NULL,
            date TEXT NOT NULL,
            title TEXT NOT NULL,
            problem TEXT NOT NULL DEFAULT '',
            tech TEXT NOT NULL DEFAULT '',
            notes TEXT NOT NULL DEFAULT '',
            code TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_entries_profile_date
            ON entries (profile, date DESC, created_at DESC);
        "#,
    )
    .context("applying schema migrations")?;
    Ok(())
}
