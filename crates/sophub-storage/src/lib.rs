//! # sophub-storage
//!
//! Blob store providers for SOP Hub. Objects are written and read by
//! clients through pre-signed URLs; the server only fetches objects to
//! verify them and deletes them when a version is discarded.

pub mod factory;
pub mod providers;
pub mod signing;
pub mod sniff;

pub use factory::{build_blob_store, ConfiguredBlobStore};
pub use providers::{LocalBlobStore, MemoryBlobStore};
#[cfg(feature = "s3")]
pub use providers::S3BlobStore;
pub use signing::UrlSigner;
