//! Core traits defined in `sophub-core` and implemented by other crates.

pub mod blob_store;

pub use blob_store::{BlobObject, BlobStore, HttpMethod, PresignedUrl};
