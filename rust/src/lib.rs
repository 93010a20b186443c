//! Directory user lookups and configuration secret encryption.
//! Key material and bind credentials are loaded once at startup and shared
//! read-only; every lookup is scoped to a single request.

pub mod config;
pub mod credentials;
pub mod crypto;
pub mod directory;
pub mod error;
