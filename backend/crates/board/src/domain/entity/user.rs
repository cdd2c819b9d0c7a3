//! User Entity
//!
//! A board member, provisioned on first federated login.

use chrono::{DateTime, Utc};
use kernel::id::UserId;

/// User entity
///
/// The default value is the anonymous user: no ID, no privileges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    /// `issuer-host/subject`, stable across logins
    pub id: UserId,
    /// Display name from the identity provider
    pub name: String,
    /// Email from the identity provider
    pub email: String,
    /// Profile picture URL from the identity provider
    pub picture_url: String,
    /// First login time
    pub created: DateTime<Utc>,
    /// Whether the most recent entry quiz attempt passed
    pub quiz_passed: bool,
    /// Number of entry quiz submissions (monotonic)
    pub quiz_attempts: u16,
    /// Banned users lose access unless they are admins
    pub banned: bool,
    /// Admins may access everything
    pub admin: bool,
}

impl User {
    /// Signed in means the user has an identity
    pub fn is_signed_in(&self) -> bool {
        !self.id.is_empty()
    }

    /// Authorized to use the board: passed the quiz and not banned, or admin
    pub fn is_authorized(&self) -> bool {
        (self.quiz_passed && !self.banned) || self.admin
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }
}
