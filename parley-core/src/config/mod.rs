//! Configuration management
//!
//! Handles loading and validation of parley configuration from a JSON file,
//! a `.env` file and environment variables.

pub mod loader;
pub mod schema;
pub mod validate;

pub use loader::ConfigLoader;
pub use schema::*;
