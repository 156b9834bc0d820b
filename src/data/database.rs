//! SQLite account store operations
//!
//! All database access goes through this module.
//! Uses SQLx with plain queries and positional binds.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        // Create connection string
        let connection_string = format!("sqlite:{}?mode=rwc", path.display());

        // Create connection pool
        let pool = SqlitePool::connect(&connection_string).await?;

        // Run migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// List every account record in the store
    pub async fn list_accounts(&self) -> Result<Vec<AccountRecord>, AppError> {
        let accounts = sqlx::query_as::<_, AccountRecord>(
            "SELECT * FROM accounts ORDER BY username COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    /// Look up an account by its email join key
    pub async fn get_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AccountRecord>, AppError> {
        let account =
            sqlx::query_as::<_, AccountRecord>("SELECT * FROM accounts WHERE email = ? LIMIT 1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        Ok(account)
    }

    /// Look up an account by its public username
    pub async fn get_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AccountRecord>, AppError> {
        let account =
            sqlx::query_as::<_, AccountRecord>("SELECT * FROM accounts WHERE username = ? LIMIT 1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        Ok(account)
    }

    /// Insert an account record unless one already exists for its email.
    ///
    /// This is atomic at the SQL statement level: concurrent first logins
    /// for the same email race here, and exactly one insert wins.
    ///
    /// # Returns
    /// `true` if inserted, `false` if a record already existed for the email.
    pub async fn insert_account_if_absent(
        &self,
        account: &AccountRecord,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (
                id, email, username, display_name, description,
                thumb_url, locale, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(email) DO NOTHING
            "#,
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&account.username)
        .bind(&account.display_name)
        .bind(&account.description)
        .bind(&account.thumb_url)
        .bind(&account.locale)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Insert a new session row
    pub async fn insert_session(&self, session: &SessionRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, email, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&session.email)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Check whether a session row is still live (present and unexpired)
    pub async fn session_is_live(&self, session_id: &str) -> Result<bool, AppError> {
        let live = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sessions WHERE id = ? AND expires_at > ?",
        )
        .bind(session_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(live > 0)
    }

    /// Delete a session row. Idempotent: deleting a missing row is not an
    /// error.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Remove rows whose expiry has passed
    ///
    /// # Returns
    /// Number of rows removed
    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
