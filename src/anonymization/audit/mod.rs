//! Audit logging module
//!
//! Writes one JSON line per run with hashed originals.

pub mod logger;

pub use logger::{hash_value, AuditLogger};
