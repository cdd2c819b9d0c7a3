//! User Service
//!
//! Orchestrates identity resolution, session issuance, quiz bookkeeping
//! and the admin user listing.

use std::sync::Arc;

use chrono::Utc;
use kernel::error::app_error::AppError;
use kernel::id::{SessionId, UserId};

use crate::application::config::BoardConfig;
use crate::application::oidc::IdTokenClaims;
use crate::application::privilege::verify_admin_privilege;
use crate::application::user_session::UserSessionService;
use crate::domain::entity::{user::User, user_session::UserSession};
use crate::domain::repository::{UserRepository, UserSessionRepository};
use crate::error::{BoardError, BoardResult, StorageError};

/// Result of a recorded quiz attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizOutcome {
    Passed,
    /// Attempts exceed the configured maximum, regardless of the answers
    TooManyAttempts,
    IncorrectAnswer,
}

impl QuizOutcome {
    /// Human-readable failure reason, empty when passed
    pub fn reason(&self) -> &'static str {
        match self {
            QuizOutcome::Passed => "",
            QuizOutcome::TooManyAttempts => {
                "Too many failed quiz attempts, please contact an administrator."
            }
            QuizOutcome::IncorrectAnswer => "Sorry, at least one answer was incorrect.",
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, QuizOutcome::Passed)
    }
}

/// Derive the local user ID from issuer and subject
///
/// The issuer loses its scheme and path, so `https://accounts.example.com`
/// with subject `abc123` becomes `accounts.example.com/abc123`.
pub fn user_id_from_claims(issuer: &str, subject: &str) -> UserId {
    let host = issuer.split_once("://").map_or(issuer, |(_, rest)| rest);
    let host = host.split('/').next().unwrap_or(host);
    UserId::new(format!("{host}/{subject}"))
}

/// User service
pub struct UserService<U, S>
where
    U: UserRepository + Send + Sync + 'static,
    S: UserSessionRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    sessions: UserSessionService<S>,
    config: Arc<BoardConfig>,
}

impl<U, S> Clone for UserService<U, S>
where
    U: UserRepository + Send + Sync + 'static,
    S: UserSessionRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            user_repo: self.user_repo.clone(),
            sessions: self.sessions.clone(),
            config: self.config.clone(),
        }
    }
}

impl<U, S> UserService<U, S>
where
    U: UserRepository + Send + Sync + 'static,
    S: UserSessionRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>, session_repo: Arc<S>, config: Arc<BoardConfig>) -> Self {
        Self {
            user_repo,
            sessions: UserSessionService::new(session_repo, config.clone()),
            config,
        }
    }

    /// Resolve the user behind a verified ID token, provisioning on first login
    ///
    /// An existing user is returned unchanged, even if the token carries a
    /// different name, email or picture. Concurrent first logins of the same
    /// account all resolve to the single stored user.
    pub async fn get_user_from_id_token(&self, claims: &IdTokenClaims) -> BoardResult<User> {
        let id = user_id_from_claims(&claims.iss, &claims.sub);

        match self.user_repo.find_by_id(&id).await {
            Ok(user) => return Ok(user),
            Err(StorageError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let mut user = User {
            id,
            name: claims.name.clone().unwrap_or_default(),
            email: claims.email.clone().unwrap_or_default(),
            picture_url: claims.picture.clone().unwrap_or_default(),
            ..User::default()
        };
        match self.create_user(&mut user).await {
            Ok(()) => {}
            // Lost the race against another login of the same account
            Err(BoardError::Storage(StorageError::AlreadyExists)) => {
                tracing::debug!(user_id = %user.id, "User provisioned concurrently");
                return self.find_user_by_id(&user.id).await;
            }
            Err(e) => return Err(e),
        }

        tracing::info!(user_id = %user.id, "Provisioned user from ID token");

        Ok(user)
    }

    /// Validate and persist a new user, setting `created`
    pub async fn create_user(&self, user: &mut User) -> BoardResult<()> {
        let mut err = AppError::validation();
        if user.id.is_empty() {
            err.add_issue("User ID required.");
        }
        if user.email.is_empty() {
            err.add_issue("User Email required.");
        }
        if user.name.is_empty() {
            err.add_issue("User Name required.");
        }
        err.into_result()?;

        user.created = Utc::now();
        self.user_repo.create(user).await?;
        Ok(())
    }

    pub async fn find_user_by_id(&self, id: &UserId) -> BoardResult<User> {
        Ok(self.user_repo.find_by_id(id).await?)
    }

    pub async fn update_user(&self, user: &User) -> BoardResult<()> {
        Ok(self.user_repo.update(user).await?)
    }

    pub async fn create_user_session(&self, user: &User, ip: &str) -> BoardResult<UserSession> {
        self.sessions.create_user_session(user, ip).await
    }

    /// Load the user owning a valid session
    pub async fn get_user_from_session_id(&self, id: &SessionId) -> BoardResult<User> {
        let session = self.sessions.find_session_by_id(id).await?;
        self.find_user_by_id(&session.user_id).await
    }

    /// Count a quiz submission and persist the result
    pub async fn record_quiz_attempt(&self, user: &mut User, passed: bool) -> BoardResult<QuizOutcome> {
        user.quiz_attempts = user.quiz_attempts.saturating_add(1);
        user.quiz_passed = passed;

        self.user_repo
            .update(user)
            .await
            .map_err(BoardError::QuizAttempt)?;

        if user.quiz_attempts > self.config.max_quiz_attempts {
            return Ok(QuizOutcome::TooManyAttempts);
        }
        if !passed {
            return Ok(QuizOutcome::IncorrectAnswer);
        }
        Ok(QuizOutcome::Passed)
    }

    /// All users, admins only
    pub async fn get_all_users(&self, actor: &User) -> BoardResult<Vec<User>> {
        verify_admin_privilege(actor)?;
        Ok(self.user_repo.find_all().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use kernel::error::kind::ErrorKind;

    use crate::infra::memory::{MemoryUserRepository, MemoryUserSessionRepository};

    type Service = UserService<MemoryUserRepository, MemoryUserSessionRepository>;

    fn service() -> (Service, Arc<MemoryUserRepository>, Arc<MemoryUserSessionRepository>) {
        let users = Arc::new(MemoryUserRepository::default());
        let sessions = Arc::new(MemoryUserSessionRepository::default());
        let service = UserService::new(
            users.clone(),
            sessions.clone(),
            Arc::new(BoardConfig::default()),
        );
        (service, users, sessions)
    }

    fn claims(name: &str) -> IdTokenClaims {
        IdTokenClaims {
            iss: "https://accounts.example.com".to_string(),
            sub: "abc123".to_string(),
            name: Some(name.to_string()),
            email: Some("jdoe@example.com".to_string()),
            picture: Some("https://example.com/jdoe.png".to_string()),
            nonce: None,
            exp: 0,
        }
    }

    #[test]
    fn test_user_id_from_claims() {
        assert_eq!(
            user_id_from_claims("https://accounts.example.com", "abc123").as_str(),
            "accounts.example.com/abc123"
        );
        assert_eq!(
            user_id_from_claims("https://login.example.com/tenant/v2.0", "xyz").as_str(),
            "login.example.com/xyz"
        );
        assert_eq!(
            user_id_from_claims("http://localhost:8080", "1").as_str(),
            "localhost:8080/1"
        );
        assert_eq!(
            user_id_from_claims("accounts.example.com", "abc123").as_str(),
            "accounts.example.com/abc123"
        );
    }

    #[tokio::test]
    async fn test_login_provisioning() {
        let (service, users, _) = service();

        let first = service.get_user_from_id_token(&claims("Jane Doe")).await.unwrap();
        assert_eq!(first.id.as_str(), "accounts.example.com/abc123");
        assert_eq!(first.name, "Jane Doe");
        assert_eq!(first.email, "jdoe@example.com");
        assert_eq!(first.picture_url, "https://example.com/jdoe.png");
        assert_eq!(first.quiz_attempts, 0);
        assert!(!first.quiz_passed && !first.banned && !first.admin);

        // Changed claims do not refresh the stored profile
        let second = service.get_user_from_id_token(&claims("Janet Doe")).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(users.find_all().await.unwrap().len(), 1);
        assert_eq!(users.find_by_id(&first.id).await.unwrap().name, "Jane Doe");
    }

    /// Lookups wait long enough for concurrent logins to all miss
    #[derive(Default)]
    struct SlowLookupUserRepository {
        inner: MemoryUserRepository,
    }

    impl UserRepository for SlowLookupUserRepository {
        async fn create(&self, user: &User) -> crate::error::StorageResult<()> {
            self.inner.create(user).await
        }

        async fn update(&self, user: &User) -> crate::error::StorageResult<()> {
            self.inner.update(user).await
        }

        async fn find_by_id(&self, id: &UserId) -> crate::error::StorageResult<User> {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.inner.find_by_id(id).await
        }

        async fn find_all(&self) -> crate::error::StorageResult<Vec<User>> {
            self.inner.find_all().await
        }

        async fn delete(&self, id: &UserId) -> crate::error::StorageResult<()> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_logins_resolve_to_one_user() {
        let users = Arc::new(SlowLookupUserRepository::default());
        let service = UserService::new(
            users.clone(),
            Arc::new(MemoryUserSessionRepository::default()),
            Arc::new(BoardConfig::default()),
        );

        let claims = claims("Jane Doe");
        let (a, b) = tokio::join!(
            service.get_user_from_id_token(&claims),
            service.get_user_from_id_token(&claims),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a, b);
        assert_eq!(a.id.as_str(), "accounts.example.com/abc123");
        assert_eq!(users.inner.find_all().await.unwrap(), vec![a]);
    }

    #[tokio::test]
    async fn test_provisioning_requires_profile() {
        let (service, _, _) = service();
        let mut claims = claims("Jane Doe");
        claims.email = None;

        let err = service.get_user_from_id_token(&claims).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_create_user_accumulates_issues() {
        let (service, users, _) = service();

        let err = service.create_user(&mut User::default()).await.unwrap_err();
        let BoardError::Service(err) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(
            err.issues().collect::<Vec<_>>(),
            vec!["User ID required.", "User Email required.", "User Name required."]
        );
        assert!(users.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_user_sets_created() {
        let (service, users, _) = service();
        let before = Utc::now();

        let mut user = User {
            id: "accounts.example.com/abc123".into(),
            name: "Jane Doe".to_string(),
            email: "jdoe@example.com".to_string(),
            ..User::default()
        };
        service.create_user(&mut user).await.unwrap();

        assert!(user.created >= before);
        assert_eq!(users.find_by_id(&user.id).await.unwrap(), user);

        let err = service.create_user(&mut user).await.unwrap_err();
        assert!(matches!(err, BoardError::Storage(StorageError::AlreadyExists)));
    }

    #[tokio::test]
    async fn test_quiz_gating() {
        let (service, users, _) = service();
        let mut user = service.get_user_from_id_token(&claims("Jane Doe")).await.unwrap();

        let outcome = service.record_quiz_attempt(&mut user, false).await.unwrap();
        assert_eq!(outcome, QuizOutcome::IncorrectAnswer);
        assert_eq!(outcome.reason(), "Sorry, at least one answer was incorrect.");
        assert_eq!(user.quiz_attempts, 1);
        assert!(!user.quiz_passed);

        let outcome = service.record_quiz_attempt(&mut user, true).await.unwrap();
        assert_eq!(outcome, QuizOutcome::Passed);
        assert_eq!(outcome.reason(), "");
        assert_eq!(user.quiz_attempts, 2);
        assert!(user.quiz_passed);

        assert_eq!(users.find_by_id(&user.id).await.unwrap(), user);
    }

    #[tokio::test]
    async fn test_quiz_too_many_attempts() {
        let (service, _, _) = service();
        let mut user = service.get_user_from_id_token(&claims("Jane Doe")).await.unwrap();
        user.quiz_attempts = 5;

        // Attempt limit wins even when the answers are right
        let outcome = service.record_quiz_attempt(&mut user, true).await.unwrap();
        assert_eq!(outcome, QuizOutcome::TooManyAttempts);
        assert_eq!(user.quiz_attempts, 6);
    }

    #[tokio::test]
    async fn test_quiz_attempt_for_unknown_user() {
        let (service, _, _) = service();
        let mut user = User {
            id: "accounts.example.com/ghost".into(),
            ..User::default()
        };

        let err = service.record_quiz_attempt(&mut user, true).await.unwrap_err();
        assert!(matches!(err, BoardError::QuizAttempt(StorageError::NotFound)));
        assert_eq!(err.to_string(), "Unable to update user");
    }

    #[tokio::test]
    async fn test_get_all_users_requires_admin() {
        let (service, _, _) = service();
        let user = service.get_user_from_id_token(&claims("Jane Doe")).await.unwrap();

        let err = service.get_all_users(&user).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let admin = User {
            admin: true,
            ..user.clone()
        };
        assert_eq!(service.get_all_users(&admin).await.unwrap(), vec![user]);
    }

    #[tokio::test]
    async fn test_get_user_from_session_id() {
        let (service, _, sessions) = service();
        let user = service.get_user_from_id_token(&claims("Jane Doe")).await.unwrap();

        let session = service.create_user_session(&user, "10.0.0.1").await.unwrap();
        assert_eq!(service.get_user_from_session_id(&session.id).await.unwrap(), user);

        let stale = UserSession {
            id: "stale".into(),
            user_id: user.id.clone(),
            created: Utc::now() - TimeDelta::days(20),
            expires: Some(Utc::now() - TimeDelta::days(6)),
            ip: String::new(),
        };
        sessions.create(&stale).await.unwrap();
        let err = service.get_user_from_session_id(&stale.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }
}
