//! Document version services.

pub mod manager;
pub mod upload;

pub use manager::{InitiateUpload, ReplaceUpload, SignedRead, UploadTicket, VersionManager};
pub use upload::{IntegrityFailure, UploadProtocol};
