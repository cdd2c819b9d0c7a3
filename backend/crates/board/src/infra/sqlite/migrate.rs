//! Schema Migrations
//!
//! Each repository registers versioned migrations. A migration runs in its
//! own transaction together with its ledger row, so a version is either
//! fully applied and recorded or not applied at all.

use std::sync::Arc;

use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use tokio::sync::OnceCell;

const CREATE_LEDGER: &str = "CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    repo TEXT NOT NULL,
    version INTEGER NOT NULL
)";

/// One schema version of a repository
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub statements: &'static [&'static str],
}

/// Migration failures. All of them are fatal to store initialization.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("creating migrations table: {0}")]
    LedgerTable(#[source] Arc<sqlx::Error>),

    #[error("selecting current version of {repo}: {source}")]
    CurrentVersion {
        repo: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("starting transaction for migration {version} of {repo}: {source}")]
    Begin {
        repo: String,
        version: i64,
        #[source]
        source: sqlx::Error,
    },

    #[error("executing statement {statement} of migration {version} on {repo}: {source}")]
    Statement {
        repo: String,
        version: i64,
        statement: usize,
        #[source]
        source: sqlx::Error,
    },

    #[error("recording migration {version} of {repo}: {source}")]
    Record {
        repo: String,
        version: i64,
        #[source]
        source: sqlx::Error,
    },

    #[error("committing migration {version} of {repo}: {source}")]
    Commit {
        repo: String,
        version: i64,
        #[source]
        source: sqlx::Error,
    },

    /// The transaction could not be rolled back after `failure`
    #[error("{failure} AND unable to roll back transaction: {rollback}")]
    RollbackFailed {
        #[source]
        failure: Box<MigrationError>,
        rollback: sqlx::Error,
    },
}

/// Applies repository migrations, tracked in the `migrations` ledger
///
/// Create exactly one controller per process and database, and pass it to
/// every repository constructor. The ledger table is created at most once
/// per controller, and concurrent first callers wait for and observe that
/// single attempt. A second controller over the same database repeats the
/// ledger creation, which `IF NOT EXISTS` makes a no-op.
#[derive(Debug, Default)]
pub struct MigrationController {
    ledger: OnceCell<Result<(), Arc<sqlx::Error>>>,
}

impl MigrationController {
    pub fn new() -> Self {
        Self::default()
    }

    async fn ensure_ledger(&self, pool: &SqlitePool) -> Result<(), MigrationError> {
        self.ledger
            .get_or_init(|| async {
                tracing::debug!("Creating migrations table");
                sqlx::query(CREATE_LEDGER)
                    .execute(pool)
                    .await
                    .map(|_| ())
                    .map_err(Arc::new)
            })
            .await
            .clone()
            .map_err(MigrationError::LedgerTable)
    }

    /// Apply every migration of `repo` newer than the recorded version, in
    /// ascending version order; stop at the first failure
    pub async fn migrate(
        &self,
        pool: &SqlitePool,
        repo: &str,
        migrations: &[Migration],
    ) -> Result<(), MigrationError> {
        self.ensure_ledger(pool).await?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM migrations WHERE repo = ?")
                .bind(repo)
                .fetch_one(pool)
                .await
                .map_err(|source| MigrationError::CurrentVersion {
                    repo: repo.to_string(),
                    source,
                })?;

        let mut pending: Vec<&Migration> = migrations
            .iter()
            .filter(|m| current.is_none_or(|current| m.version > current))
            .collect();
        pending.sort_by_key(|m| m.version);

        for migration in pending {
            apply(pool, repo, migration).await?;
            tracing::info!(repo, version = migration.version, "Applied migration");
        }

        Ok(())
    }
}

async fn apply(pool: &SqlitePool, repo: &str, migration: &Migration) -> Result<(), MigrationError> {
    let version = migration.version;

    let mut tx = pool.begin().await.map_err(|source| MigrationError::Begin {
        repo: repo.to_string(),
        version,
        source,
    })?;

    for (statement, sql) in migration.statements.iter().enumerate() {
        if let Err(source) = sqlx::query(sql).execute(&mut *tx).await {
            let failure = MigrationError::Statement {
                repo: repo.to_string(),
                version,
                statement,
                source,
            };
            return Err(rollback(tx, failure).await);
        }
    }

    let recorded = sqlx::query("INSERT INTO migrations (repo, version) VALUES (?, ?)")
        .bind(repo)
        .bind(version)
        .execute(&mut *tx)
        .await;
    if let Err(source) = recorded {
        let failure = MigrationError::Record {
            repo: repo.to_string(),
            version,
            source,
        };
        return Err(rollback(tx, failure).await);
    }

    tx.commit().await.map_err(|source| MigrationError::Commit {
        repo: repo.to_string(),
        version,
        source,
    })
}

async fn rollback(tx: Transaction<'_, Sqlite>, failure: MigrationError) -> MigrationError {
    match tx.rollback().await {
        Ok(()) => failure,
        Err(rollback) => MigrationError::RollbackFailed {
            failure: Box::new(failure),
            rollback,
        },
    }
}
