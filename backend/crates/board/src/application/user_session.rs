//! User Session Service
//!
//! Issues and validates opaque session tokens.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::SessionId;
use platform::crypto::random_token;

use crate::application::config::BoardConfig;
use crate::domain::entity::{user::User, user_session::UserSession};
use crate::domain::repository::UserSessionRepository;
use crate::error::{BoardError, BoardResult};

/// Random bytes per session token (a multiple of 3 encodes without padding)
pub const SESSION_TOKEN_BYTES: usize = 18;

/// User session service
pub struct UserSessionService<S>
where
    S: UserSessionRepository + Send + Sync + 'static,
{
    session_repo: Arc<S>,
    config: Arc<BoardConfig>,
}

impl<S> Clone for UserSessionService<S>
where
    S: UserSessionRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            session_repo: self.session_repo.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S> UserSessionService<S>
where
    S: UserSessionRepository + Send + Sync + 'static,
{
    pub fn new(session_repo: Arc<S>, config: Arc<BoardConfig>) -> Self {
        Self {
            session_repo,
            config,
        }
    }

    /// Create and persist a new session for `user`, issued to `ip`
    pub async fn create_user_session(&self, user: &User, ip: &str) -> BoardResult<UserSession> {
        if user.id.is_empty() {
            return Err(BoardError::MissingUserId);
        }

        let created = Utc::now();
        let session = UserSession {
            id: SessionId::new(random_token(SESSION_TOKEN_BYTES)),
            user_id: user.id.clone(),
            created,
            expires: Some(created + self.config.session_ttl_delta()),
            ip: ip.to_string(),
        };

        self.session_repo.create(&session).await?;

        tracing::debug!(user_id = %session.user_id, "Issued user session");

        Ok(session)
    }

    /// Find a session that exists and has not expired
    pub async fn find_session_by_id(&self, id: &SessionId) -> BoardResult<UserSession> {
        let session = self
            .session_repo
            .find_by_id(id)
            .await
            .map_err(BoardError::Session)?;

        if session.is_expired(Utc::now()) {
            return Err(BoardError::SessionExpired);
        }

        Ok(session)
    }
}
