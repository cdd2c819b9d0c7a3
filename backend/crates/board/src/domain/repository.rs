//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the infrastructure
//! layer (in-memory and SQLite).
//!
//! Cancellation follows the usual async contract: dropping a returned future
//! abandons the operation, and an open SQL transaction is rolled back.

use chrono::{DateTime, Utc};
use kernel::id::{QuoteId, SessionId, UserId};

use crate::domain::entity::{quote::Quote, user::User, user_session::UserSession};
use crate::error::StorageResult;

/// Quote repository trait
#[trait_variant::make(QuoteRepository: Send)]
pub trait LocalQuoteRepository {
    /// Create a new quote, `AlreadyExists` on duplicate ID
    async fn create(&self, quote: &Quote) -> StorageResult<()>;

    /// Replace an existing quote, `NotFound` if absent
    async fn update(&self, quote: &Quote) -> StorageResult<()>;

    /// Find quote by ID, `NotFound` if absent
    async fn find_by_id(&self, id: &QuoteId) -> StorageResult<Quote>;

    /// All quotes, in no particular order
    async fn find_all(&self) -> StorageResult<Vec<Quote>>;

    /// Delete quote by ID, `NotFound` if absent
    async fn delete(&self, id: &QuoteId) -> StorageResult<()>;
}

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Create a new user, `AlreadyExists` on duplicate ID
    async fn create(&self, user: &User) -> StorageResult<()>;

    /// Replace an existing user, `NotFound` if absent
    async fn update(&self, user: &User) -> StorageResult<()>;

    /// Find user by ID, `NotFound` if absent
    async fn find_by_id(&self, id: &UserId) -> StorageResult<User>;

    /// All users, in no particular order
    async fn find_all(&self) -> StorageResult<Vec<User>>;

    /// Delete user by ID, `NotFound` if absent
    async fn delete(&self, id: &UserId) -> StorageResult<()>;
}

/// User session repository trait
#[trait_variant::make(UserSessionRepository: Send)]
pub trait LocalUserSessionRepository {
    /// Create a new session, `AlreadyExists` on duplicate ID
    async fn create(&self, session: &UserSession) -> StorageResult<()>;

    /// Find session by ID, `NotFound` if absent (expiry is not checked here)
    async fn find_by_id(&self, id: &SessionId) -> StorageResult<UserSession>;

    /// Remove sessions expired at `now`, returning how many were removed
    async fn delete_expired(&self, now: DateTime<Utc>) -> StorageResult<u64>;
}
