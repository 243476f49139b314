//! Gulp core library: API-name parsing, the remote-source contract and config.
//!
//! Public API surface:
//! - [`entity_name`]: [`EntityName`] parsing and rendering
//! - [`types`]: [`Namespace`] newtype and mirror directory naming
//! - [`source`]: [`RemoteSource`] trait and request/response shapes
//! - [`config`]: [`GulpConfig`] load with `_at` variants
//! - [`error`]: [`SourceError`], [`ConfigError`]

pub mod config;
pub mod entity_name;
pub mod error;
pub mod source;
pub mod types;

pub use config::GulpConfig;
pub use entity_name::{EntityName, TypeSuffix, FIELD_SUFFIXES, OBJECT_SUFFIXES};
pub use error::{ConfigError, SourceError};
pub use source::{
    query_as, soql_literal, FieldDescribe, QueryApi, QueryRequest, Record, RemoteSource, SObjectDescribe,
    MAX_FETCH,
};
pub use types::{target_directory, Namespace, UNMANAGED};
