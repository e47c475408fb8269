//! Common utilities shared across the gateway crates.
//!
//! This crate provides:
//! - Unified error handling for the HTTP boundary
//! - Configuration structures

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult};
