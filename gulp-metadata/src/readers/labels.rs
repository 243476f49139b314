use async_trait::async_trait;
use serde::Deserialize;

use gulp_core::{query_as, target_directory, QueryRequest};
use gulp_renderer::{ArtifactKind, Renderer};

use super::{group_by_namespace, MetadataReader, NamespacedRecord, ReaderContext};
use crate::error::ReaderError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExternalStringRecord {
    name: String,
    namespace_prefix: Option<String>,
}

impl NamespacedRecord for ExternalStringRecord {
    fn namespace_prefix(&self) -> Option<&str> {
        self.namespace_prefix.as_deref()
    }
}

/// Custom labels, merged into one `CustomLabels.labels-meta.xml` per
/// namespace. Protected labels of managed packages are not visible to
/// subscribers and are skipped.
pub struct LabelReader;

#[async_trait]
impl MetadataReader for LabelReader {
    fn name(&self) -> &'static str {
        "labels"
    }

    async fn read(&self, ctx: &ReaderContext<'_>) -> Result<(), ReaderError> {
        let request = QueryRequest::tooling("ExternalString", &["Name", "NamespacePrefix"])
            .with_filter(ctx.namespace_filter(Some("IsProtected = false")));
        let records: Vec<ExternalStringRecord> = query_as(ctx.source, &request).await?;
        let renderer = Renderer::new()?;

        for (namespace, labels) in group_by_namespace(records) {
            let names: Vec<&str> = labels.iter().map(|l| l.name.as_str()).collect();
            let contents = renderer.render_labels(&names)?;
            let directory = target_directory(namespace.as_ref());
            ctx.store.stage(ArtifactKind::Labels.path(directory, ""), contents);
            tracing::debug!(namespace = directory, count = names.len(), "staged labels");
        }
        Ok(())
    }
}
