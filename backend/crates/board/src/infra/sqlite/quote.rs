//! SQLite Quote Repository

use chrono::{DateTime, Utc};
use kernel::id::QuoteId;
use sqlx::SqlitePool;

use crate::domain::entity::quote::Quote;
use crate::domain::repository::QuoteRepository;
use crate::error::{StorageError, StorageResult};
use crate::infra::sqlite::{Migration, MigrationController, MigrationError, map_insert_error};

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    statements: &["CREATE TABLE quotes (
        id TEXT PRIMARY KEY,
        submitter_id TEXT NOT NULL,
        quotee TEXT NOT NULL,
        context TEXT NOT NULL,
        quote TEXT NOT NULL,
        created TIMESTAMP NOT NULL
    )"],
}];

/// SQLite-backed quote repository
#[derive(Clone)]
pub struct SqliteQuoteRepository {
    pool: SqlitePool,
}

impl SqliteQuoteRepository {
    pub async fn new(pool: SqlitePool, controller: &MigrationController) -> Result<Self, MigrationError> {
        controller.migrate(&pool, "quote", MIGRATIONS).await?;
        Ok(Self { pool })
    }
}

impl QuoteRepository for SqliteQuoteRepository {
    async fn create(&self, quote: &Quote) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO quotes (id, submitter_id, quotee, context, quote, created)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(quote.id.as_str())
        .bind(quote.submitter_id.as_str())
        .bind(&quote.quotee)
        .bind(&quote.context)
        .bind(&quote.text)
        .bind(quote.created)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(())
    }

    async fn update(&self, quote: &Quote) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE quotes
            SET submitter_id = ?, quotee = ?, context = ?, quote = ?, created = ?
            WHERE id = ?
            "#,
        )
        .bind(quote.submitter_id.as_str())
        .bind(&quote.quotee)
        .bind(&quote.context)
        .bind(&quote.text)
        .bind(quote.created)
        .bind(quote.id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &QuoteId) -> StorageResult<Quote> {
        let row = sqlx::query_as::<_, QuoteRow>(
            r#"
            SELECT id, submitter_id, quotee, context, quote, created
            FROM quotes
            WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuoteRow::into_quote).ok_or(StorageError::NotFound)
    }

    async fn find_all(&self) -> StorageResult<Vec<Quote>> {
        let rows = sqlx::query_as::<_, QuoteRow>(
            r#"
            SELECT id, submitter_id, quotee, context, quote, created
            FROM quotes
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(QuoteRow::into_quote).collect())
    }

    async fn delete(&self, id: &QuoteId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM quotes WHERE id = ?")
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
struct QuoteRow {
    id: String,
    submitter_id: String,
    quotee: String,
    context: String,
    quote: String,
    created: DateTime<Utc>,
}

impl QuoteRow {
    fn into_quote(self) -> Quote {
        Quote {
            id: self.id.into(),
            submitter_id: self.submitter_id.into(),
            quotee: self.quotee,
            context: self.context,
            text: self.quote,
            created: self.created,
        }
    }
}
