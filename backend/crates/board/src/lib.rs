//! Board Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities and repository traits
//! - `application/` - Services (users, sessions, quotes, entry quiz, OIDC login)
//! - `infra/` - In-memory and SQLite repository implementations
//! - `presentation/` - Login, callback and logout handlers
//!
//! ## Features
//! - Federated login (OIDC authorization code flow)
//! - Account provisioning keyed by `issuer-host/subject`
//! - Server-side sessions with cookie-based tokens
//! - Entry quiz gating and admin-only user listing
//!
//! ## Security Model
//! - State and nonce anti-forgery cookies checked on every callback
//! - ID tokens verified against the provider's published keys
//! - Session tokens are 18 random bytes, the sole credential

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::{BoardConfig, OidcConfig};
pub use error::{BoardError, BoardResult, StorageError, StorageResult};
pub use infra::memory::MemoryStore;
pub use infra::sqlite::SqliteStore;
pub use presentation::router::board_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
}

pub mod store {
    pub use crate::infra::memory::MemoryStore;
    pub use crate::infra::sqlite::SqliteStore;
}
