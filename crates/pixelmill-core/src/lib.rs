//! # pixelmill-core
//!
//! Core crate for Pixelmill. Contains the port traits, configuration
//! schemas, job-key and correlation types, the backoff policy, and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other Pixelmill crates.

pub mod backoff;
pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
