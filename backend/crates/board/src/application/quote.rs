//! Quote Service
//!
//! Submission, browsing and time-limited editing of quotes.

use std::sync::Arc;

use chrono::Utc;
use kernel::error::app_error::{AppError, AppResult};
use kernel::id::QuoteId;
use nid::Nanoid;

use crate::application::config::BoardConfig;
use crate::application::privilege::verify_user_privilege;
use crate::domain::entity::{quote::Quote, user::User};
use crate::domain::repository::QuoteRepository;
use crate::error::BoardResult;

const NOT_EDITABLE: &str = "You do not have permission to edit this quote. \
    Quotes can only be edited by their submitter within an hour of submission.";

fn validate_quote(quote: &Quote) -> AppResult<()> {
    let mut err = AppError::validation();
    if quote.text.trim().is_empty() {
        err.add_issue("Quote must not be blank.");
    }
    if quote.quotee.trim().is_empty() {
        err.add_issue("This quote must be attributed to someone.");
    }
    err.into_result()
}

/// Quote service
pub struct QuoteService<Q>
where
    Q: QuoteRepository + Send + Sync + 'static,
{
    quote_repo: Arc<Q>,
    config: Arc<BoardConfig>,
}

impl<Q> Clone for QuoteService<Q>
where
    Q: QuoteRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            quote_repo: self.quote_repo.clone(),
            config: self.config.clone(),
        }
    }
}

impl<Q> QuoteService<Q>
where
    Q: QuoteRepository + Send + Sync + 'static,
{
    pub fn new(quote_repo: Arc<Q>, config: Arc<BoardConfig>) -> Self {
        Self { quote_repo, config }
    }

    /// Submit a new quote as `actor`
    ///
    /// Assigns the ID, the submission time and the submitter.
    pub async fn create_quote(&self, actor: &User, quote: &mut Quote) -> BoardResult<()> {
        verify_user_privilege(actor)?;
        validate_quote(quote)?;

        let id: Nanoid = Nanoid::new();
        quote.id = QuoteId::new(id.as_str());
        quote.created = Utc::now();
        quote.submitter_id = actor.id.clone();

        self.quote_repo.create(quote).await?;
        Ok(())
    }

    pub async fn get_quote(&self, actor: &User, id: &QuoteId) -> BoardResult<Quote> {
        verify_user_privilege(actor)?;
        Ok(self.quote_repo.find_by_id(id).await?)
    }

    /// Replace the text, quotee and context of an editable quote
    ///
    /// The stored ID, submitter and submission time are kept.
    pub async fn update_quote(&self, actor: &User, quote: &Quote) -> BoardResult<()> {
        verify_user_privilege(actor)?;

        let stored = self.editable_quote(actor, &quote.id).await?;
        validate_quote(quote)?;

        let updated = Quote {
            quotee: quote.quotee.clone(),
            context: quote.context.clone(),
            text: quote.text.clone(),
            ..stored
        };
        self.quote_repo.update(&updated).await?;
        Ok(())
    }

    pub async fn delete_quote(&self, actor: &User, id: &QuoteId) -> BoardResult<()> {
        verify_user_privilege(actor)?;

        let stored = self.editable_quote(actor, id).await?;
        self.quote_repo.delete(&stored.id).await?;
        Ok(())
    }

    pub async fn get_all_quotes(&self, actor: &User) -> BoardResult<Vec<Quote>> {
        verify_user_privilege(actor)?;
        Ok(self.quote_repo.find_all().await?)
    }

    async fn editable_quote(&self, actor: &User, id: &QuoteId) -> BoardResult<Quote> {
        let stored = self.quote_repo.find_by_id(id).await?;
        if !stored.editable(actor, Utc::now(), self.config.quote_edit_window_delta()) {
            return Err(AppError::unauthorized(NOT_EDITABLE).into());
        }
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use kernel::error::kind::ErrorKind;

    use crate::error::{BoardError, StorageError};
    use crate::infra::memory::MemoryQuoteRepository;

    fn service() -> (QuoteService<MemoryQuoteRepository>, Arc<MemoryQuoteRepository>) {
        let repo = Arc::new(MemoryQuoteRepository::default());
        let service = QuoteService::new(repo.clone(), Arc::new(BoardConfig::default()));
        (service, repo)
    }

    fn member(id: &str) -> User {
        User {
            id: id.into(),
            quiz_passed: true,
            ..User::default()
        }
    }

    fn draft() -> Quote {
        Quote {
            quotee: "Krystian".to_string(),
            context: "on moving day".to_string(),
            text: "Isn't every truck a hand truck?".to_string(),
            ..Quote::default()
        }
    }

    #[tokio::test]
    async fn test_create_quote() {
        let (service, repo) = service();
        let joe = member("joe");

        let mut quote = draft();
        service.create_quote(&joe, &mut quote).await.unwrap();

        assert!(!quote.id.is_empty());
        assert_eq!(quote.submitter_id, joe.id);
        assert_eq!(repo.find_by_id(&quote.id).await.unwrap(), quote);
        assert_eq!(service.get_quote(&joe, &quote.id).await.unwrap(), quote);
    }

    #[tokio::test]
    async fn test_create_quote_validation() {
        let (service, repo) = service();

        let mut quote = Quote {
            quotee: "  ".to_string(),
            text: "\t".to_string(),
            ..Quote::default()
        };
        let err = service
            .create_quote(&member("joe"), &mut quote)
            .await
            .unwrap_err()
            .into_app_error();

        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(
            err.issues().collect::<Vec<_>>(),
            vec!["Quote must not be blank.", "This quote must be attributed to someone."]
        );
        assert!(repo.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_actor_cannot_read() {
        let (service, _) = service();

        let err = service.get_all_quotes(&User::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let outsider = User {
            id: "outsider".into(),
            ..User::default()
        };
        let err = service.get_all_quotes(&outsider).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_get_missing_quote() {
        let (service, _) = service();
        let err = service
            .get_quote(&member("joe"), &QuoteId::new("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Storage(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_quote_keeps_identity() {
        let (service, repo) = service();
        let joe = member("joe");

        let mut quote = draft();
        service.create_quote(&joe, &mut quote).await.unwrap();

        let edit = Quote {
            text: "Every truck is a hand truck.".to_string(),
            submitter_id: "someone-else".into(),
            ..quote.clone()
        };
        service.update_quote(&joe, &edit).await.unwrap();

        let stored = repo.find_by_id(&quote.id).await.unwrap();
        assert_eq!(stored.text, "Every truck is a hand truck.");
        assert_eq!(stored.submitter_id, joe.id);
        assert_eq!(stored.created, quote.created);
    }

    #[tokio::test]
    async fn test_edit_window() {
        let (service, repo) = service();
        let joe = member("joe");
        let admin = User {
            admin: true,
            ..member("admin")
        };

        let old = Quote {
            id: "old".into(),
            submitter_id: joe.id.clone(),
            created: Utc::now() - TimeDelta::hours(2),
            ..draft()
        };
        repo.create(&old).await.unwrap();

        let err = service.update_quote(&joe, &old).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        let err = service.delete_quote(&member("charlene"), &old.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        service.delete_quote(&admin, &old.id).await.unwrap();
        assert!(repo.find_by_id(&old.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_clones_share_repository() {
        let (service, _) = service();
        let joe = member("joe");

        let mut quote = draft();
        service.clone().create_quote(&joe, &mut quote).await.unwrap();

        assert_eq!(service.get_all_quotes(&joe).await.unwrap(), vec![quote]);
    }

    #[tokio::test]
    async fn test_delete_own_quote() {
        let (service, _) = service();
        let joe = member("joe");

        let mut quote = draft();
        service.create_quote(&joe, &mut quote).await.unwrap();
        service.delete_quote(&joe, &quote.id).await.unwrap();

        assert!(service.get_all_quotes(&joe).await.unwrap().is_empty());
    }
}
