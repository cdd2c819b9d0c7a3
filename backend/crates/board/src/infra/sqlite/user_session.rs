//! SQLite User Session Repository

use chrono::{DateTime, Utc};
use kernel::id::SessionId;
use sqlx::SqlitePool;

use crate::domain::entity::user_session::UserSession;
use crate::domain::repository::UserSessionRepository;
use crate::error::{StorageError, StorageResult};
use crate::infra::sqlite::{Migration, MigrationController, MigrationError, map_insert_error};

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    statements: &["CREATE TABLE usersessions (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        created TIMESTAMP NOT NULL,
        expires TIMESTAMP,
        ip TEXT NOT NULL
    )"],
}];

/// SQLite-backed user session repository
#[derive(Clone)]
pub struct SqliteUserSessionRepository {
    pool: SqlitePool,
}

impl SqliteUserSessionRepository {
    pub async fn new(pool: SqlitePool, controller: &MigrationController) -> Result<Self, MigrationError> {
        controller.migrate(&pool, "usersession", MIGRATIONS).await?;
        Ok(Self { pool })
    }
}

impl UserSessionRepository for SqliteUserSessionRepository {
    async fn create(&self, session: &UserSession) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO usersessions (id, user_id, created, expires, ip)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.id.as_str())
        .bind(session.user_id.as_str())
        .bind(session.created)
        .bind(session.expires)
        .bind(&session.ip)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> StorageResult<UserSession> {
        let row = sqlx::query_as::<_, UserSessionRow>(
            r#"
            SELECT id, user_id, created, expires, ip
            FROM usersessions
            WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserSessionRow::into_session)
            .ok_or(StorageError::NotFound)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StorageResult<u64> {
        // julianday() compares instants regardless of fractional digits
        let deleted = sqlx::query(
            r#"
            DELETE FROM usersessions
            WHERE expires IS NULL OR julianday(expires) <= julianday(?)
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        tracing::info!(sessions_deleted = deleted, "Cleaned up expired user sessions");

        Ok(deleted)
    }
}

#[derive(sqlx::FromRow)]
struct UserSessionRow {
    id: String,
    user_id: String,
    created: DateTime<Utc>,
    expires: Option<DateTime<Utc>>,
    ip: String,
}

impl UserSessionRow {
    fn into_session(self) -> UserSession {
        UserSession {
            id: self.id.into(),
            user_id: self.user_id.into(),
            created: self.created,
            expires: self.expires,
            ip: self.ip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::conformance;
    use crate::infra::sqlite::test_pool;

    #[tokio::test]
    async fn test_user_session_repository() {
        let repo = SqliteUserSessionRepository::new(test_pool().await, &MigrationController::new())
            .await
            .unwrap();
        conformance::user_session_repository(&repo).await;
    }
}
