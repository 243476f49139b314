use async_trait::async_trait;
use serde::Deserialize;

use gulp_core::{query_as, QueryRequest};
use gulp_renderer::ArtifactKind;

use super::{
    group_by_namespace, stage_each, MetadataReader, NamespacedRecord, ReaderContext, HIDDEN_SENTINEL,
};
use crate::error::ReaderError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApexPageRecord {
    name: String,
    #[serde(default)]
    markup: String,
    namespace_prefix: Option<String>,
}

impl NamespacedRecord for ApexPageRecord {
    fn namespace_prefix(&self) -> Option<&str> {
        self.namespace_prefix.as_deref()
    }

    fn is_hidden(&self) -> bool {
        self.markup == HIDDEN_SENTINEL
    }
}

/// Visualforce pages.
pub struct PageReader;

#[async_trait]
impl MetadataReader for PageReader {
    fn name(&self) -> &'static str {
        "pages"
    }

    async fn read(&self, ctx: &ReaderContext<'_>) -> Result<(), ReaderError> {
        let request = QueryRequest::tooling("ApexPage", &["Name", "Markup", "NamespacePrefix"])
            .with_filter(ctx.namespace_filter(None));
        let records: Vec<ApexPageRecord> = query_as(ctx.source, &request).await?;
        let groups = group_by_namespace(records);
        let staged = stage_each(ctx, &groups, ArtifactKind::Page, |p| {
            (p.name.as_str(), p.markup.as_str())
        });
        tracing::info!(count = staged.values().sum::<usize>(), "staged pages");
        Ok(())
    }
}
