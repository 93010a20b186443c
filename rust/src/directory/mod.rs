//! Directory access: raw entries, projection into user records, OU
//! selection, the LDAP gateway, and the lookup service tying them together.

pub mod entry;
pub mod gateway;
pub mod ou;
pub mod projector;
pub mod service;
