//! Presentation Layer
//!
//! HTTP handlers and router for the login flow.

pub mod handlers;
pub mod router;

pub use handlers::BoardAppState;
pub use router::board_router;
