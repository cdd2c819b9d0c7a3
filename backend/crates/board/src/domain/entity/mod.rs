//! Entities

pub mod quote;
pub mod user;
pub mod user_session;
