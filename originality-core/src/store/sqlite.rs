//! SQLite implementation of the fingerprint store.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};

use super::{FingerprintRecord, FingerprintStore, Medium, NewFingerprint};
use crate::error::{OriginalityError, Result};

/// SQLite-backed fingerprint store.
///
/// Every `put` is a single INSERT, so a concurrent scan sees either the whole
/// row or nothing. Scans run as one SELECT and therefore read a consistent
/// snapshot.
#[derive(Clone)]
pub struct SqliteFingerprintStore {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct ImageRow {
    image_id: String,
    phash: Vec<u8>,
    segment: String,
    registered_at: DateTime<Utc>,
}

impl From<ImageRow> for FingerprintRecord {
    fn from(row: ImageRow) -> Self {
        Self {
            asset_id: row.image_id,
            signature: row.phash,
            variant_tag: Some(row.segment),
            embedding: None,
            registered_at: row.registered_at,
        }
    }
}

#[derive(FromRow)]
struct TextRow {
    text_id: String,
    signature: Vec<u8>,
    embedding: Option<Vec<u8>>,
    registered_at: DateTime<Utc>,
}

impl From<TextRow> for FingerprintRecord {
    fn from(row: TextRow) -> Self {
        Self {
            asset_id: row.text_id,
            signature: row.signature,
            variant_tag: None,
            embedding: row.embedding,
            registered_at: row.registered_at,
        }
    }
}

impl SqliteFingerprintStore {
    /// Open (creating if missing) the database at `database_url` and apply migrations.
    ///
    /// Accepts URLs such as `sqlite://fingerprints.db` or `sqlite::memory:`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| OriginalityError::StorageError(format!("invalid database url: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| OriginalityError::StorageError(format!("connection failed: {e}")))?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!(url = %database_url, "Fingerprint store connected and migrations applied");

        Ok(Self { pool })
    }

    /// Open a private in-memory database.
    ///
    /// Limited to a single connection: every SQLite in-memory connection is
    /// its own database.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    /// Create a store from an existing pool (migrations must already be applied).
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FingerprintStore for SqliteFingerprintStore {
    async fn put(&self, fingerprint: NewFingerprint) -> Result<()> {
        let now = Utc::now();
        match fingerprint.medium {
            Medium::Image => {
                let segment = fingerprint.variant_tag.as_deref().unwrap_or("full");
                sqlx::query(
                    r#"
                    INSERT INTO image_hashes (image_id, phash, segment, registered_at)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(&fingerprint.asset_id)
                .bind(&fingerprint.signature)
                .bind(segment)
                .bind(now)
                .execute(&self.pool)
                .await?;
            }
            Medium::Text => {
                sqlx::query(
                    r#"
                    INSERT INTO text_assets (text_id, signature, embedding, registered_at)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(&fingerprint.asset_id)
                .bind(&fingerprint.signature)
                .bind(&fingerprint.embedding)
                .bind(now)
                .execute(&self.pool)
                .await?;
            }
        }

        tracing::debug!(
            medium = %fingerprint.medium,
            asset_id = %fingerprint.asset_id,
            "Stored fingerprint row"
        );

        Ok(())
    }

    async fn scan_all(&self, medium: Medium) -> Result<Vec<FingerprintRecord>> {
        let records = match medium {
            Medium::Image => {
                let rows: Vec<ImageRow> = sqlx::query_as(
                    r#"
                    SELECT image_id, phash, segment, registered_at
                    FROM image_hashes
                    ORDER BY id
                    "#,
                )
                .fetch_all(&self.pool)
                .await?;
                rows.into_iter().map(Into::into).collect()
            }
            Medium::Text => {
                let rows: Vec<TextRow> = sqlx::query_as(
                    r#"
                    SELECT text_id, signature, embedding, registered_at
                    FROM text_assets
                    ORDER BY id
                    "#,
                )
                .fetch_all(&self.pool)
                .await?;
                rows.into_iter().map(Into::into).collect()
            }
        };

        Ok(records)
    }

    async fn count(&self, medium: Medium) -> Result<usize> {
        let sql = match medium {
            Medium::Image => "SELECT COUNT(*) FROM image_hashes",
            Medium::Text => "SELECT COUNT(*) FROM text_assets",
        };
        let count: i64 = sqlx::query_scalar(sql).fetch_one(&self.pool).await?;
        Ok(count.max(0) as usize)
    }
}
