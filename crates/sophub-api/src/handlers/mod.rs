//! Route handlers organized by domain.

pub mod blob;
pub mod health;
pub mod sop;
