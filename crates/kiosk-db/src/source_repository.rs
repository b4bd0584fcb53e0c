use chrono::{DateTime, Utc};
use kiosk_core::error::AppError;
use kiosk_core::models::{NewSource, Source, SourceSummary};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Repository for source definitions in SQLite.
///
/// Ids are stored as hyphenated uuid text; `rowid` preserves insertion
/// order, which is also the cycle's processing order.
#[derive(Clone)]
pub struct SourceRepository {
    pool: SqlitePool,
}

impl SourceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new source. Returns the generated id.
    pub async fn create(&self, source: &NewSource) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO sources (id, name, url, processing, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&source.name)
        .bind(&source.url)
        .bind(&source.processing)
        .bind(source.is_active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(id)
    }

    pub async fn read(&self, id: Uuid) -> Result<Option<Source>, AppError> {
        let row = sqlx::query_as::<_, SourceRow>(
            r#"
            SELECT id, name, url, processing, is_active, created_at, updated_at
            FROM sources
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        row.map(Source::try_from).transpose()
    }

    /// Full replace by id.
    pub async fn update(&self, id: Uuid, source: &NewSource) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE sources
            SET name = ?, url = ?, processing = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&source.name)
        .bind(&source.url)
        .bind(&source.processing)
        .bind(source.is_active)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("source {id}")));
        }
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM sources WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("source {id}")));
        }
        Ok(())
    }

    /// Ids of active sources in insertion order.
    pub async fn list_active_ids(&self) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM sources WHERE is_active = 1 ORDER BY rowid")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        ids.iter().map(|raw| parse_id(raw)).collect()
    }

    /// All sources (active or not) in insertion order, without scripts.
    pub async fn list_summaries(&self) -> Result<Vec<SourceSummary>, AppError> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            "SELECT id, name, is_active FROM sources ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                Ok(SourceSummary {
                    id: parse_id(&row.id)?,
                    name: row.name,
                    is_active: row.is_active,
                })
            })
            .collect()
    }
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw)
        .map_err(|e| AppError::DatabaseError(format!("corrupt source id '{raw}': {e}")))
}

// -- Internal row types for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct SourceRow {
    id: String,
    name: String,
    url: String,
    processing: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SourceRow> for Source {
    type Error = AppError;

    fn try_from(row: SourceRow) -> Result<Self, AppError> {
        Ok(Source {
            id: parse_id(&row.id)?,
            name: row.name,
            url: row.url,
            processing: row.processing,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: String,
    name: String,
    is_active: bool,
}

// -- Trait implementation --

impl kiosk_core::traits::SourceStore for SourceRepository {
    async fn create(&self, source: &NewSource) -> Result<Uuid, AppError> {
        SourceRepository::create(self, source).await
    }

    async fn read(&self, id: Uuid) -> Result<Option<Source>, AppError> {
        SourceRepository::read(self, id).await
    }

    async fn update(&self, id: Uuid, source: &NewSource) -> Result<(), AppError> {
        SourceRepository::update(self, id, source).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        SourceRepository::delete(self, id).await
    }

    async fn list_active_ids(&self) -> Result<Vec<Uuid>, AppError> {
        SourceRepository::list_active_ids(self).await
    }

    async fn list_summaries(&self) -> Result<Vec<SourceSummary>, AppError> {
        SourceRepository::list_summaries(self).await
    }
}
