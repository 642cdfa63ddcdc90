//! Layered settings: built-in defaults, an optional YAML file, then
//! `PROMETHEIA_*` environment variables, merged with figment.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
