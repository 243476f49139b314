//! Installed managed packages.

use serde::{Deserialize, Serialize};

use gulp_core::{query_as, Namespace, QueryRequest, RemoteSource, SourceError};

/// A package installed in the org.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageInfo {
    pub namespace: Namespace,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstalledPackageRecord {
    subscriber_package: Option<SubscriberPackage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SubscriberPackage {
    namespace_prefix: Option<String>,
    name: Option<String>,
    description: Option<String>,
}

/// Namespaced packages installed in the org, sorted by namespace.
pub async fn list_packages(source: &dyn RemoteSource) -> Result<Vec<PackageInfo>, SourceError> {
    let request = QueryRequest::tooling(
        "InstalledSubscriberPackage",
        &[
            "SubscriberPackage.NamespacePrefix",
            "SubscriberPackage.Name",
            "SubscriberPackage.Description",
        ],
    );
    let records: Vec<InstalledPackageRecord> = query_as(source, &request).await?;

    let mut packages: Vec<PackageInfo> = records
        .into_iter()
        .filter_map(|r| r.subscriber_package)
        .filter_map(|p| {
            let namespace = p.namespace_prefix.filter(|n| !n.is_empty())?;
            Some(PackageInfo {
                namespace: Namespace::from(namespace),
                name: p.name.unwrap_or_default(),
                description: p.description.unwrap_or_default(),
            })
        })
        .collect();
    packages.sort_by(|a, b| a.namespace.cmp(&b.namespace));
    Ok(packages)
}
