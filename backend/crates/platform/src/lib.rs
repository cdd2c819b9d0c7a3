//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (secure random tokens, constant-time comparison)
//! - Cookie management
//! - Client identification (IP extraction behind trusted proxies)

pub mod client;
pub mod cookie;
pub mod crypto;
