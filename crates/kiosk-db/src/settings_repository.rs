use kiosk_core::error::AppError;
use sqlx::SqlitePool;

/// Key-value settings persistence. Values are stored as JSON text.
#[derive(Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, AppError> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        raw.map(|s| serde_json::from_str(&s).map_err(AppError::from))
            .transpose()
    }

    pub async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), AppError> {
        let raw = serde_json::to_string(&value)?;
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(raw)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    /// Write each default that is currently absent; present keys are left
    /// untouched.
    pub async fn init_defaults(
        &self,
        defaults: &[(&str, serde_json::Value)],
    ) -> Result<(), AppError> {
        for (key, value) in defaults {
            let raw = serde_json::to_string(value)?;
            sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(raw)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        }
        Ok(())
    }
}

// -- Trait implementation --

impl kiosk_core::traits::SettingsStore for SettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, AppError> {
        SettingsRepository::get(self, key).await
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), AppError> {
        SettingsRepository::set(self, key, value).await
    }

    async fn init_defaults(
        &self,
        defaults: &[(&str, serde_json::Value)],
    ) -> Result<(), AppError> {
        SettingsRepository::init_defaults(self, defaults).await
    }
}
