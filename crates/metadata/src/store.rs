//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{FilePartRow, FileRow, meta_from_rows};
use async_trait::async_trait;
use granary_core::FileMeta;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

/// Persistent mapping from file name to its ordered part list, with the
/// two-phase processing -> committed lifecycle.
///
/// A record is inserted as *processing* before any bytes move, and promoted
/// to *committed* in one transaction only after every part is durably
/// stored. Readers see committed records only, so a half-written file is
/// never observable; a crash mid-upload leaves the processing record (with
/// its full part list) behind for inspection or external cleanup.
#[async_trait]
pub trait FileMetaStore: Send + Sync {
    /// Insert a new processing-state record.
    ///
    /// Fails with `AlreadyExists` when the name is already present in the
    /// processing or the committed set: re-uploading a name is rejected,
    /// never silently overwritten.
    async fn put_processing(&self, meta: &FileMeta) -> MetadataResult<()>;

    /// Promote the named processing record to committed.
    ///
    /// One atomic transaction copies the record and its parts into the
    /// committed tables and deletes the processing record. Fails with
    /// `NotFound` when no processing record exists; on any failure the
    /// transaction rolls back and the processing record is untouched.
    async fn complete(&self, name: &str) -> MetadataResult<()>;

    /// Fetch a committed record.
    ///
    /// `NotFound` covers both "never uploaded" and "still processing".
    async fn get(&self, name: &str) -> MetadataResult<FileMeta>;

    /// Fetch a processing record, for inspection of interrupted uploads.
    async fn get_processing(&self, name: &str) -> MetadataResult<FileMeta>;

    /// Check store connectivity.
    async fn health_check(&self) -> MetadataResult<()>;
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS processing_files (
    name TEXT PRIMARY KEY,
    content_length INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS processing_file_parts (
    file_name TEXT NOT NULL REFERENCES processing_files(name) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    host TEXT NOT NULL,
    path TEXT NOT NULL,
    content_length INTEGER NOT NULL,
    PRIMARY KEY (file_name, position)
);

CREATE TABLE IF NOT EXISTS files (
    name TEXT PRIMARY KEY,
    content_length INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS file_parts (
    file_name TEXT NOT NULL REFERENCES files(name) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    host TEXT NOT NULL,
    path TEXT NOT NULL,
    content_length INTEGER NOT NULL,
    PRIMARY KEY (file_name, position)
);
"#;

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store and run migrations.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection
            // avoids persistent "database is locked" failures under load.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn fetch_meta(
        &self,
        file_table: &str,
        part_table: &str,
        key_column: &str,
        name: &str,
    ) -> MetadataResult<FileMeta> {
        let file_query =
            format!("SELECT name, content_length, created_at FROM {file_table} WHERE name = ?");
        let file: Option<FileRow> = sqlx::query_as(&file_query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        let file = file.ok_or_else(|| MetadataError::NotFound(name.to_string()))?;

        let parts_query = format!(
            "SELECT file_name, position, host, path, content_length FROM {part_table} \
             WHERE {key_column} = ? ORDER BY position"
        );
        let parts: Vec<FilePartRow> = sqlx::query_as(&parts_query)
            .bind(name)
            .fetch_all(&self.pool)
            .await?;

        Ok(meta_from_rows(file, parts))
    }
}

fn map_unique_violation(err: sqlx::Error, name: &str) -> MetadataError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.message().contains("UNIQUE constraint")
    {
        return MetadataError::AlreadyExists(name.to_string());
    }
    err.into()
}

#[async_trait]
impl FileMetaStore for SqliteStore {
    async fn put_processing(&self, meta: &FileMeta) -> MetadataResult<()> {
        let mut tx = self.pool.begin().await?;

        let committed: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM files WHERE name = ?)")
            .bind(&meta.name)
            .fetch_one(&mut *tx)
            .await?;
        if committed {
            return Err(MetadataError::AlreadyExists(meta.name.clone()));
        }

        sqlx::query("INSERT INTO processing_files (name, content_length, created_at) VALUES (?, ?, ?)")
            .bind(&meta.name)
            .bind(meta.content_length as i64)
            .bind(OffsetDateTime::now_utc())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, &meta.name))?;

        for part in FilePartRow::from_meta(meta) {
            sqlx::query(
                "INSERT INTO processing_file_parts (file_name, position, host, path, content_length) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&part.file_name)
            .bind(part.position)
            .bind(&part.host)
            .bind(&part.path)
            .bind(part.content_length)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn complete(&self, name: &str) -> MetadataResult<()> {
        let mut tx = self.pool.begin().await?;

        let moved = sqlx::query(
            "INSERT INTO files (name, content_length, created_at) \
             SELECT name, content_length, created_at FROM processing_files WHERE name = ?",
        )
        .bind(name)
        .execute(&mut *tx)
        .await?;
        if moved.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(MetadataError::NotFound(name.to_string()));
        }

        sqlx::query(
            "INSERT INTO file_parts (file_name, position, host, path, content_length) \
             SELECT file_name, position, host, path, content_length \
             FROM processing_file_parts WHERE file_name = ?",
        )
        .bind(name)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM processing_file_parts WHERE file_name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM processing_files WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, name: &str) -> MetadataResult<FileMeta> {
        self.fetch_meta("files", "file_parts", "file_name", name).await
    }

    async fn get_processing(&self, name: &str) -> MetadataResult<FileMeta> {
        self.fetch_meta("processing_files", "processing_file_parts", "file_name", name)
            .await
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
