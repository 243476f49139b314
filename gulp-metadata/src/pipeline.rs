//! The gulp orchestrator.
//!
//! ```text
//! resolve home namespace
//!   -> working set = requested - home
//!   -> run every reader concurrently (each stages into one StubFs)
//!   -> barrier
//!   -> any failure?  yes: return it, mirror untouched
//!                    no:  StubFs::sync
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use futures::future::join_all;
use serde::Deserialize;

use gulp_core::{query_as, Namespace, QueryRequest, RemoteSource, SourceError};
use gulp_sync::{StubFs, SyncReport};

use crate::error::{Failure, GulpError};
use crate::readers::{self, ReaderContext};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OrganizationRecord {
    namespace_prefix: Option<String>,
}

/// The org's own namespace: set only when exactly one distinct prefix is
/// reported.
pub async fn resolve_home_namespace(
    source: &dyn RemoteSource,
) -> Result<Option<Namespace>, SourceError> {
    let request = QueryRequest::data("Organization", &["NamespacePrefix"]);
    let records: Vec<OrganizationRecord> = query_as(source, &request).await?;
    let prefixes: BTreeSet<String> = records
        .into_iter()
        .filter_map(|r| r.namespace_prefix)
        .filter(|p| !p.is_empty())
        .collect();

    if prefixes.len() > 1 {
        tracing::warn!(?prefixes, "organization reports several namespaces, treating as none");
        return Ok(None);
    }
    Ok(prefixes.into_iter().next().map(Namespace::from))
}

/// Requested namespaces minus the home namespace, deduplicated.
pub fn working_set(requested: &[Namespace], home: Option<&Namespace>) -> BTreeSet<Namespace> {
    requested
        .iter()
        .filter(|ns| Some(*ns) != home)
        .cloned()
        .collect()
}

/// A completed, failure-free gather, ready to diff or sync.
#[derive(Debug)]
pub struct Gathered {
    pub home: Option<Namespace>,
    pub namespaces: BTreeSet<Namespace>,
    pub store: StubFs,
}

/// Run every reader against `source`, staging into the mirror of
/// `workspace`. Nothing is written to disk.
pub async fn gather(
    source: &dyn RemoteSource,
    workspace: &Path,
    requested: &[Namespace],
) -> Result<Gathered, GulpError> {
    let home = resolve_home_namespace(source)
        .await
        .map_err(GulpError::HomeNamespace)?;
    let namespaces = working_set(requested, home.as_ref());
    tracing::info!(
        home = home.as_ref().map(Namespace::as_str).unwrap_or("-"),
        namespaces = ?namespaces,
        "gulping metadata"
    );

    let store = StubFs::open(workspace)?;
    let readers = readers::all();
    let failures: Vec<Failure> = {
        let ctx = ReaderContext {
            source,
            home: home.as_ref(),
            namespaces: &namespaces,
            store: &store,
        };
        join_all(readers.iter().map(|reader| reader.run(&ctx)))
            .await
            .into_iter()
            .flatten()
            .collect()
    };

    let failed = failures.len();
    if let Some(failure) = failures.into_iter().next() {
        return Err(GulpError::Reader { failure, failed });
    }

    Ok(Gathered {
        home,
        namespaces,
        store,
    })
}

/// [`gather`], then commit the staged files (or only report them when
/// `dry_run`).
pub async fn run(
    source: &dyn RemoteSource,
    workspace: &Path,
    requested: &[Namespace],
    dry_run: bool,
) -> Result<SyncReport, GulpError> {
    let gathered = gather(source, workspace, requested).await?;
    let report = gathered.store.sync(dry_run)?;
    tracing::info!(
        written = report.written(),
        unchanged = report.unchanged(),
        deleted = report.deleted(),
        dry_run,
        "mirror synced"
    );
    Ok(report)
}
