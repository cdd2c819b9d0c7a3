//! Domain Layer
//!
//! Contains entities and repository traits.

pub mod entity;
pub mod repository;

// Re-exports
pub use entity::{quote::Quote, user::User, user_session::UserSession};
pub use repository::{QuoteRepository, UserRepository, UserSessionRepository};
