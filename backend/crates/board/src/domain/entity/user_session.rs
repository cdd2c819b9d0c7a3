//! User Session Entity
//!
//! Server-side session. The ID is the session token: whoever presents it
//! is authenticated as `user_id` until the session expires.

use chrono::{DateTime, Utc};
use kernel::id::{SessionId, UserId};

/// User session entity
///
/// Sessions are never mutated after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSession {
    /// Random URL-safe token
    pub id: SessionId,
    /// Owner of the session
    pub user_id: UserId,
    /// Created timestamp
    pub created: DateTime<Utc>,
    /// Expiry; a session without one is always expired
    pub expires: Option<DateTime<Utc>>,
    /// IP address the session was issued to
    pub ip: String,
}

impl UserSession {
    /// Expired when `now >= expires`, or when no expiry is set
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_none_or(|expires| now >= expires)
    }
}
