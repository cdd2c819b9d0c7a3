//! Application Layer
//!
//! Services and application configuration.

pub mod config;
pub mod entry_quiz;
pub mod oidc;
pub mod privilege;
pub mod quote;
pub mod user;
pub mod user_session;

// Re-exports
pub use config::{BoardConfig, OidcConfig};
pub use entry_quiz::{EntryQuiz, QuizQuestion};
pub use oidc::{
    CallbackRequest, DiscoveredProvider, IdTokenClaims, IdentityProvider, LoginChallenge,
    OidcError, OidcService,
};
pub use quote::QuoteService;
pub use user::{QuizOutcome, UserService};
pub use user_session::UserSessionService;
