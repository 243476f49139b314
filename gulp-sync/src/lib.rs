//! # gulp-sync
//!
//! The mirror store: a write-back cache over `<workspace>/.apexlink/gulp`.
//!
//! Readers [`StubFs::stage`] file contents; one [`StubFs::sync`] call then
//! writes what changed and deletes what is no longer produced.

pub mod diff;
pub mod error;
pub mod store;
pub mod walk;

pub use diff::FileDiff;
pub use error::SyncError;
pub use store::{store_root_at, StubFs, SyncReport, WriteResult};
