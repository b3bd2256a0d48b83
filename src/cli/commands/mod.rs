//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod ids;
pub mod init;
pub mod pools;
pub mod text;
pub mod validate;
