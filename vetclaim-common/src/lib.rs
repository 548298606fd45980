//! # VetClaim Common Library
//!
//! Shared code for the VetClaim sync binaries including:
//! - Canonical record model (claims, ratings, appeals, auth session)
//! - Persistent key-value store capability and implementations
//! - Command bus message types
//! - Configuration loading
//! - Clock abstraction for cooldown and timer logic

pub mod commands;
pub mod config;
pub mod error;
pub mod model;
pub mod store;
pub mod time;

pub use error::{Error, Result};
pub use store::KeyValueStore;
