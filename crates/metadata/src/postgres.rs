//! PostgreSQL metadata store.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{FilePartRow, FileRow, meta_from_rows};
use crate::store::FileMetaStore;
use async_trait::async_trait;
use granary_core::FileMeta;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS processing_files (
    name TEXT PRIMARY KEY,
    content_length BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS processing_file_parts (
    file_name TEXT NOT NULL REFERENCES processing_files(name) ON DELETE CASCADE,
    position BIGINT NOT NULL,
    host TEXT NOT NULL,
    path TEXT NOT NULL,
    content_length BIGINT NOT NULL,
    PRIMARY KEY (file_name, position)
);

CREATE TABLE IF NOT EXISTS files (
    name TEXT PRIMARY KEY,
    content_length BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS file_parts (
    file_name TEXT NOT NULL REFERENCES files(name) ON DELETE CASCADE,
    position BIGINT NOT NULL,
    host TEXT NOT NULL,
    path TEXT NOT NULL,
    content_length BIGINT NOT NULL,
    PRIMARY KEY (file_name, position)
);
"#;

/// PostgreSQL-based metadata store.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect using a connection URL and run migrations.
    pub async fn from_url(url: &str, max_connections: u32) -> MetadataResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> MetadataResult<()> {
        // The schema script is idempotent; statements run one at a time
        // because PostgreSQL rejects multi-statement prepared queries.
        for statement in SCHEMA_SQL.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_part(
        tx: &mut Transaction<'_, Postgres>,
        part: &FilePartRow,
    ) -> MetadataResult<()> {
        sqlx::query(
            "INSERT INTO processing_file_parts (file_name, position, host, path, content_length) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&part.file_name)
        .bind(part.position)
        .bind(&part.host)
        .bind(&part.path)
        .bind(part.content_length)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn fetch_meta(
        &self,
        file_table: &str,
        part_table: &str,
        name: &str,
    ) -> MetadataResult<FileMeta> {
        let file_query =
            format!("SELECT name, content_length, created_at FROM {file_table} WHERE name = $1");
        let file: Option<FileRow> = sqlx::query_as(&file_query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        let file = file.ok_or_else(|| MetadataError::NotFound(name.to_string()))?;

        let parts_query = format!(
            "SELECT file_name, position, host, path, content_length FROM {part_table} \
             WHERE file_name = $1 ORDER BY position"
        );
        let parts: Vec<FilePartRow> = sqlx::query_as(&parts_query)
            .bind(name)
            .fetch_all(&self.pool)
            .await?;

        Ok(meta_from_rows(file, parts))
    }
}

fn map_unique_violation(err: sqlx::Error, name: &str) -> MetadataError {
    // PostgreSQL SQLSTATE 23505 = unique_violation.
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.code().as_deref() == Some("23505")
    {
        return MetadataError::AlreadyExists(name.to_string());
    }
    err.into()
}

#[async_trait]
impl FileMetaStore for PostgresStore {
    async fn put_processing(&self, meta: &FileMeta) -> MetadataResult<()> {
        let mut tx = self.pool.begin().await?;

        let committed: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM files WHERE name = $1)")
                .bind(&meta.name)
                .fetch_one(&mut *tx)
                .await?;
        if committed {
            return Err(MetadataError::AlreadyExists(meta.name.clone()));
        }

        sqlx::query(
            "INSERT INTO processing_files (name, content_length, created_at) VALUES ($1, $2, $3)",
        )
        .bind(&meta.name)
        .bind(meta.content_length as i64)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, &meta.name))?;

        for part in FilePartRow::from_meta(meta) {
            Self::insert_part(&mut tx, &part).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn complete(&self, name: &str) -> MetadataResult<()> {
        let mut tx = self.pool.begin().await?;

        let moved = sqlx::query(
            "INSERT INTO files (name, content_length, created_at) \
             SELECT name, content_length, created_at FROM processing_files WHERE name = $1",
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
             FROM processing_file_parts WHERE file_name = $1",
        )
        .bind(name)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM processing_file_parts WHERE file_name = $1")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM processing_files WHERE name = $1")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, name: &str) -> MetadataResult<FileMeta> {
        self.fetch_meta("files", "file_parts", name).await
    }

    async fn get_processing(&self, name: &str) -> MetadataResult<FileMeta> {
        self.fetch_meta("processing_files", "processing_file_parts", name).await
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
