//! Infrastructure adapters for external systems.

pub mod generators;
pub mod http;
pub mod sqlite;
