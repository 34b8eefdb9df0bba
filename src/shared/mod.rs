//! Shared Module
//!
//! Types and data structures shared by the storage, reconciliation, and
//! sync layers: message identities and bodies, the pending/confirmed
//! message union, content signatures, directory caches, and error types.

pub mod directory;
pub mod error;
pub mod message;
