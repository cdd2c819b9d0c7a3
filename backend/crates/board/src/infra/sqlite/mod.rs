//! SQLite Repository Implementations
//!
//! Three repositories sharing one connection pool. Each migrates its own
//! table through the shared [`MigrationController`] when constructed.

pub mod migrate;
pub mod quote;
pub mod user;
pub mod user_session;

pub use migrate::{Migration, MigrationController, MigrationError};
pub use quote::SqliteQuoteRepository;
pub use user::SqliteUserRepository;
pub use user_session::SqliteUserSessionRepository;

use sqlx::SqlitePool;

use crate::error::StorageError;

/// Extended result code for a primary key violation
const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";

/// Map a failed INSERT: primary key violations become `AlreadyExists`
pub(crate) fn map_insert_error(err: sqlx::Error) -> StorageError {
    let duplicate = matches!(
        &err,
        sqlx::Error::Database(db_err)
            if db_err.code().as_deref() == Some(SQLITE_CONSTRAINT_PRIMARYKEY)
    );

    if duplicate {
        StorageError::AlreadyExists
    } else {
        StorageError::Database(err)
    }
}

/// All three SQLite repositories over one pool
#[derive(Clone)]
pub struct SqliteStore {
    pub quotes: SqliteQuoteRepository,
    pub users: SqliteUserRepository,
    pub sessions: SqliteUserSessionRepository,
}

impl SqliteStore {
    /// Construct (and migrate) every repository
    ///
    /// The store must not be used if this fails.
    pub async fn new(pool: SqlitePool, controller: &MigrationController) -> Result<Self, MigrationError> {
        let (quotes, users, sessions) = tokio::try_join!(
            SqliteQuoteRepository::new(pool.clone(), controller),
            SqliteUserRepository::new(pool.clone(), controller),
            SqliteUserSessionRepository::new(pool, controller),
        )?;

        Ok(Self {
            quotes,
            users,
            sessions,
        })
    }
}

/// Single-connection in-memory database that lives as long as the pool
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

/// File database with a multi-connection pool, opened like the server does
#[cfg(test)]
pub(crate) async fn file_pool(path: &std::path::Path) -> SqlitePool {
    let options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::user::User;
    use crate::domain::repository::{QuoteRepository, UserRepository, UserSessionRepository};

    #[tokio::test]
    async fn test_file_store_migrates_concurrently_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.db");

        for _ in 0..2 {
            // Each iteration is a fresh process start
            let pool = file_pool(&path).await;
            let store = SqliteStore::new(pool.clone(), &MigrationController::new())
                .await
                .unwrap();
            assert!(store.quotes.find_all().await.unwrap().is_empty());
            pool.close().await;
        }

        let pool = file_pool(&path).await;
        let ledger: Vec<(String, i64)> =
            sqlx::query_as("SELECT repo, version FROM migrations ORDER BY repo")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(
            ledger,
            vec![
                ("quote".to_string(), 1),
                ("user".to_string(), 1),
                ("usersession".to_string(), 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_store_shares_one_ledger() {
        let pool = test_pool().await;
        let controller = MigrationController::new();

        let store = SqliteStore::new(pool.clone(), &controller).await.unwrap();

        let repos: Vec<String> = sqlx::query_scalar("SELECT repo FROM migrations ORDER BY repo")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(repos, vec!["quote", "user", "usersession"]);

        let user = User {
            id: "accounts.example.com/abc123".into(),
            ..User::default()
        };
        store.users.create(&user).await.unwrap();
        assert!(store.sessions.delete_expired(chrono::Utc::now()).await.is_ok());
    }

    #[tokio::test]
    async fn test_reopening_store_does_not_migrate_again() {
        let pool = test_pool().await;

        SqliteStore::new(pool.clone(), &MigrationController::new())
            .await
            .unwrap();
        SqliteStore::new(pool.clone(), &MigrationController::new())
            .await
            .unwrap();

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 3);
    }

    #[tokio::test]
    async fn test_other_insert_errors_pass_through() {
        let pool = test_pool().await;
        let err = sqlx::query("INSERT INTO missing_table VALUES (1)")
            .execute(&pool)
            .await
            .unwrap_err();
        assert!(matches!(map_insert_error(err), StorageError::Database(_)));
    }
}
