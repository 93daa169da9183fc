//! Core types and utilities for parley
//!
//! This crate provides the error type, configuration loading, logging setup
//! and the bounded per-session conversation history shared by the other
//! parley crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
