//! # gulp-client
//!
//! [`SalesforceClient`] implements [`gulp_core::RemoteSource`] over the REST
//! query/describe endpoints and the SOAP metadata `retrieve` call.

pub mod client;
pub mod error;
pub mod rest;
pub mod soap;

pub use client::{ClientSettings, SalesforceClient};
pub use error::ClientError;
