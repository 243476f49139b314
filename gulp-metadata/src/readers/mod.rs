//! Metadata readers.
//!
//! Each reader pulls one artifact kind from the remote source, groups the
//! results by owning namespace, renders them, and stages them into the
//! shared store. Readers never write to disk themselves.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use gulp_core::{soql_literal, target_directory, Namespace, RemoteSource};
use gulp_renderer::ArtifactKind;
use gulp_sync::StubFs;

use crate::error::{Failure, ReaderError};

mod classes;
mod components;
mod flows;
mod labels;
mod pages;
pub mod sobjects;

pub use classes::ClassReader;
pub use components::ComponentReader;
pub use flows::FlowReader;
pub use labels::LabelReader;
pub use pages::PageReader;
pub use sobjects::SObjectReader;

/// Content the remote source substitutes for bodies the caller may not see.
pub const HIDDEN_SENTINEL: &str = "(hidden)";

/// Shared, read-only state for one gulp run.
pub struct ReaderContext<'a> {
    pub source: &'a dyn RemoteSource,
    /// The org's own namespace, if it has exactly one.
    pub home: Option<&'a Namespace>,
    /// Managed namespaces to pull, never containing `home`.
    pub namespaces: &'a BTreeSet<Namespace>,
    pub store: &'a StubFs,
}

impl<'a> ReaderContext<'a> {
    /// SOQL condition selecting unmanaged records, the home namespace and
    /// every working namespace. `managed_condition` further restricts the
    /// working-namespace terms only.
    pub fn namespace_filter(&self, managed_condition: Option<&str>) -> String {
        let mut terms: Vec<String> = self
            .namespaces
            .iter()
            .map(|ns| {
                let term = format!("NamespacePrefix = {}", soql_literal(ns.as_str()));
                match managed_condition {
                    Some(extra) => format!("({term} AND {extra})"),
                    None => term,
                }
            })
            .collect();
        if let Some(home) = self.home {
            terms.push(format!("NamespacePrefix = {}", soql_literal(home.as_str())));
        }
        terms.push("NamespacePrefix = null".to_string());
        terms.join(" OR ")
    }

    /// Whether artifacts owned by `namespace` belong in the mirror.
    pub fn is_processed(&self, namespace: Option<&Namespace>) -> bool {
        match namespace {
            None => true,
            Some(ns) => self.home == Some(ns) || self.namespaces.contains(ns),
        }
    }
}

/// One artifact kind's pull-and-stage logic.
#[async_trait]
pub trait MetadataReader: Send + Sync {
    /// Short name used in logs and failure reports.
    fn name(&self) -> &'static str;

    async fn read(&self, ctx: &ReaderContext<'_>) -> Result<(), ReaderError>;

    /// [`read`](Self::read), with any error captured as a [`Failure`].
    async fn run(&self, ctx: &ReaderContext<'_>) -> Option<Failure> {
        match self.read(ctx).await {
            Ok(()) => {
                tracing::debug!(reader = self.name(), "reader finished");
                None
            }
            Err(err) => {
                tracing::error!(reader = self.name(), error = %err, "reader failed");
                Some(Failure::new(self.name(), &err))
            }
        }
    }
}

/// Every reader, in a stable order.
pub fn all() -> Vec<Box<dyn MetadataReader>> {
    vec![
        Box::new(ClassReader),
        Box::new(PageReader),
        Box::new(ComponentReader),
        Box::new(FlowReader),
        Box::new(LabelReader),
        Box::new(SObjectReader),
    ]
}

// ---------------------------------------------------------------------------
// Group-then-render-then-stage
// ---------------------------------------------------------------------------

/// A query row that lands in the mirror under its namespace.
pub(crate) trait NamespacedRecord {
    fn namespace_prefix(&self) -> Option<&str>;

    /// Redacted rows are never staged.
    fn is_hidden(&self) -> bool {
        false
    }
}

/// Bucket `records` by owning namespace, dropping hidden ones.
pub(crate) fn group_by_namespace<T: NamespacedRecord>(
    records: Vec<T>,
) -> BTreeMap<Option<Namespace>, Vec<T>> {
    let mut groups: BTreeMap<Option<Namespace>, Vec<T>> = BTreeMap::new();
    for record in records {
        if record.is_hidden() {
            continue;
        }
        let namespace = record
            .namespace_prefix()
            .filter(|prefix| !prefix.is_empty())
            .map(Namespace::from);
        groups.entry(namespace).or_default().push(record);
    }
    groups
}

/// Stage one file per record; `render` yields `(name, contents)`.
///
/// Returns the number of files staged per mirror directory.
pub(crate) fn stage_each<T>(
    ctx: &ReaderContext<'_>,
    groups: &BTreeMap<Option<Namespace>, Vec<T>>,
    kind: ArtifactKind,
    render: impl Fn(&T) -> (&str, &str),
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for (namespace, records) in groups {
        let directory = target_directory(namespace.as_ref());
        for record in records {
            let (name, contents) = render(record);
            ctx.store.stage(kind.path(directory, name), contents);
        }
        tracing::debug!(kind = ?kind, namespace = directory, count = records.len(), "staged");
        counts.insert(directory.to_string(), records.len());
    }
    counts
}
