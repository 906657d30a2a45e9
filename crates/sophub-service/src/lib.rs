//! # sophub-service
//!
//! Business logic for SOP Hub. The [`VersionManager`] owns every version
//! state transition and drives the metadata store and the blob store; the
//! [`UploadProtocol`] handles the two-phase handoff between issuing a write
//! URL and verifying the object that was written.
//!
//! Services follow constructor injection: all dependencies are provided at
//! construction time via `Arc` references.

pub mod document;

pub use document::{
    InitiateUpload, IntegrityFailure, ReplaceUpload, SignedRead, UploadProtocol, UploadTicket,
    VersionManager,
};
