//! SQLite User Repository

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use sqlx::SqlitePool;

use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::error::{StorageError, StorageResult};
use crate::infra::sqlite::{Migration, MigrationController, MigrationError, map_insert_error};

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    statements: &["CREATE TABLE users (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        picture_url TEXT NOT NULL,
        created TIMESTAMP NOT NULL,
        quiz_attempts SMALLINT NOT NULL,
        quiz_passed BOOLEAN NOT NULL,
        banned BOOLEAN NOT NULL,
        admin BOOLEAN NOT NULL
    )"],
}];

/// SQLite-backed user repository
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub async fn new(pool: SqlitePool, controller: &MigrationController) -> Result<Self, MigrationError> {
        controller.migrate(&pool, "user", MIGRATIONS).await?;
        Ok(Self { pool })
    }
}

impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &User) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id,
                name,
                email,
                picture_url,
                created,
                quiz_attempts,
                quiz_passed,
                banned,
                admin
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.picture_url)
        .bind(user.created)
        .bind(user.quiz_attempts)
        .bind(user.quiz_passed)
        .bind(user.banned)
        .bind(user.admin)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(())
    }

    async fn update(&self, user: &User) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = ?,
                email = ?,
                picture_url = ?,
                created = ?,
                quiz_attempts = ?,
                quiz_passed = ?,
                banned = ?,
                admin = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.picture_url)
        .bind(user.created)
        .bind(user.quiz_attempts)
        .bind(user.quiz_passed)
        .bind(user.banned)
        .bind(user.admin)
        .bind(user.id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> StorageResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                id,
                name,
                email,
                picture_url,
                created,
                quiz_attempts,
                quiz_passed,
                banned,
                admin
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).ok_or(StorageError::NotFound)
    }

    async fn find_all(&self) -> StorageResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                id,
                name,
                email,
                picture_url,
                created,
                quiz_attempts,
                quiz_passed,
                banned,
                admin
            FROM users
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }

    async fn delete(&self, id: &UserId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    picture_url: String,
    created: DateTime<Utc>,
    quiz_attempts: u16,
    quiz_passed: bool,
    banned: bool,
    admin: bool,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id.into(),
            name: self.name,
            email: self.email,
            picture_url: self.picture_url,
            created: self.created,
            quiz_passed: self.quiz_passed,
            quiz_attempts: self.quiz_attempts,
            banned: self.banned,
            admin: self.admin,
        }
    }
}
