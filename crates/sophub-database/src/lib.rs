//! # sophub-database
//!
//! Metadata store for document versions: the [`VersionStore`] contract, a
//! PostgreSQL implementation with embedded migrations, and an in-memory
//! implementation for development and tests.

pub mod connection;
pub mod migration;
pub mod store;

pub use connection::DatabasePool;
pub use store::{MemoryVersionStore, PgVersionStore, RestoreOutcome, VersionStore};
