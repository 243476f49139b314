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
struct ApexComponentRecord {
    name: String,
    #[serde(default)]
    markup: String,
    namespace_prefix: Option<String>,
}

impl NamespacedRecord for ApexComponentRecord {
    fn namespace_prefix(&self) -> Option<&str> {
        self.namespace_prefix.as_deref()
    }

    fn is_hidden(&self) -> bool {
        self.markup == HIDDEN_SENTINEL
    }
}

/// Visualforce components.
pub struct ComponentReader;

#[async_trait]
impl MetadataReader for ComponentReader {
    fn name(&self) -> &'static str {
        "components"
    }

    async fn read(&self, ctx: &ReaderContext<'_>) -> Result<(), ReaderError> {
        let request = QueryRequest::tooling("ApexComponent", &["Name", "Markup", "NamespacePrefix"])
            .with_filter(ctx.namespace_filter(None));
        let records: Vec<ApexComponentRecord> = query_as(ctx.source, &request).await?;
        let groups = group_by_namespace(records);
        let staged = stage_each(ctx, &groups, ArtifactKind::Component, |c| {
            (c.name.as_str(), c.markup.as_str())
        });
        tracing::info!(count = staged.values().sum::<usize>(), "staged components");
        Ok(())
    }
}
