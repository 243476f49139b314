//! Domain types shared across the gulp crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Directory name used for artifacts that carry no namespace.
pub const UNMANAGED: &str = "unmanaged";

/// An ownership namespace prefix (package or org-local).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Namespace(pub String);

impl Namespace {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Namespace {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Namespace {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// First-level mirror directory for an optional namespace.
pub fn target_directory(namespace: Option<&Namespace>) -> &str {
    match namespace {
        Some(ns) => ns.as_str(),
        None => UNMANAGED,
    }
}
