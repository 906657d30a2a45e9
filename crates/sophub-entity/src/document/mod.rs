//! Document version domain entities.

pub mod filter;
pub mod kind;
pub mod model;
pub mod state;

pub use filter::VersionFilter;
pub use kind::DocumentKind;
pub use model::{CommitDetails, DocumentVersion, NewDocumentVersion};
pub use state::VersionState;
