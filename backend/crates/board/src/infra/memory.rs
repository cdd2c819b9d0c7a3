//! In-Memory Repository Implementations
//!
//! One guarded map per entity type. Reads take the shared lock, writes the
//! exclusive one, and `create` checks for the key under the same exclusive
//! lock it inserts with.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::{QuoteId, SessionId, UserId};
use tokio::sync::RwLock;

use crate::domain::entity::{quote::Quote, user::User, user_session::UserSession};
use crate::domain::repository::{QuoteRepository, UserRepository, UserSessionRepository};
use crate::error::{StorageError, StorageResult};

/// A guarded map, the sole owner of its entries
struct Table<K, V> {
    rows: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> Clone for Table<K, V> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
        }
    }
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<K, V> Table<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    async fn create(&self, key: &K, value: &V) -> StorageResult<()> {
        match self.rows.write().await.entry(key.clone()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(value.clone());
                Ok(())
            }
        }
    }

    async fn update(&self, key: &K, value: &V) -> StorageResult<()> {
        match self.rows.write().await.get_mut(key) {
            Some(row) => {
                *row = value.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound),
        }
    }

    async fn find(&self, key: &K) -> StorageResult<V> {
        self.rows
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    /// Snapshot of every row at a single point in time
    async fn all(&self) -> Vec<V> {
        self.rows.read().await.values().cloned().collect()
    }

    async fn delete(&self, key: &K) -> StorageResult<()> {
        self.rows
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    async fn retain(&self, keep: impl Fn(&V) -> bool) -> u64 {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, row| keep(row));
        (before - rows.len()) as u64
    }
}

/// In-memory quote repository
#[derive(Clone, Default)]
pub struct MemoryQuoteRepository {
    table: Table<QuoteId, Quote>,
}

impl QuoteRepository for MemoryQuoteRepository {
    async fn create(&self, quote: &Quote) -> StorageResult<()> {
        self.table.create(&quote.id, quote).await
    }

    async fn update(&self, quote: &Quote) -> StorageResult<()> {
        self.table.update(&quote.id, quote).await
    }

    async fn find_by_id(&self, id: &QuoteId) -> StorageResult<Quote> {
        self.table.find(id).await
    }

    async fn find_all(&self) -> StorageResult<Vec<Quote>> {
        Ok(self.table.all().await)
    }

    async fn delete(&self, id: &QuoteId) -> StorageResult<()> {
        self.table.delete(id).await
    }
}

/// In-memory user repository
#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    table: Table<UserId, User>,
}

impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: &User) -> StorageResult<()> {
        self.table.create(&user.id, user).await
    }

    async fn update(&self, user: &User) -> StorageResult<()> {
        self.table.update(&user.id, user).await
    }

    async fn find_by_id(&self, id: &UserId) -> StorageResult<User> {
        self.table.find(id).await
    }

    async fn find_all(&self) -> StorageResult<Vec<User>> {
        Ok(self.table.all().await)
    }

    async fn delete(&self, id: &UserId) -> StorageResult<()> {
        self.table.delete(id).await
    }
}

/// In-memory user session repository
#[derive(Clone, Default)]
pub struct MemoryUserSessionRepository {
    table: Table<SessionId, UserSession>,
}

impl UserSessionRepository for MemoryUserSessionRepository {
    async fn create(&self, session: &UserSession) -> StorageResult<()> {
        self.table.create(&session.id, session).await
    }

    async fn find_by_id(&self, id: &SessionId) -> StorageResult<UserSession> {
        self.table.find(id).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StorageResult<u64> {
        Ok(self.table.retain(|session| !session.is_expired(now)).await)
    }
}

/// All three in-memory repositories, for ephemeral deployments and tests
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub quotes: MemoryQuoteRepository,
    pub users: MemoryUserRepository,
    pub sessions: MemoryUserSessionRepository,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}
