//! # sophub-core
//!
//! Core crate for SOP Hub. Contains the blob store trait and presigned URL
//! types, configuration schemas, and the unified error system.
//!
//! This crate has **no** internal dependencies on other SOP Hub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
