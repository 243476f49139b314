//! # gulp-metadata
//!
//! Metadata readers and the gulp orchestrator.
//!
//! [`pipeline::run`] resolves the org's home namespace, runs every
//! [`MetadataReader`] concurrently against a [`RemoteSource`], and commits the
//! staged files to the mirror with a single store sync, or leaves the mirror
//! untouched if any reader failed.
//!
//! [`RemoteSource`]: gulp_core::RemoteSource

pub mod archive;
pub mod error;
pub mod object_doc;
pub mod packages;
pub mod pipeline;
pub mod readers;

pub use error::{DocumentError, Failure, GulpError, ReaderError};
pub use object_doc::{AlienField, ObjectDocument, ObjectSplit, XmlElement, XmlNode};
pub use packages::{list_packages, PackageInfo};
pub use pipeline::{gather, resolve_home_namespace, run, working_set, Gathered};
pub use readers::{MetadataReader, ReaderContext};
