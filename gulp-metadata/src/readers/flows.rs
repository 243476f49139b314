use async_trait::async_trait;
use serde::Deserialize;

use gulp_core::{query_as, QueryRequest};
use gulp_renderer::ArtifactKind;

use super::{group_by_namespace, stage_each, MetadataReader, NamespacedRecord, ReaderContext};
use crate::error::ReaderError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FlowDefinitionRecord {
    developer_name: String,
    namespace_prefix: Option<String>,
}

impl NamespacedRecord for FlowDefinitionRecord {
    fn namespace_prefix(&self) -> Option<&str> {
        self.namespace_prefix.as_deref()
    }
}

/// Flow definitions. Only existence matters, so files are empty.
pub struct FlowReader;

#[async_trait]
impl MetadataReader for FlowReader {
    fn name(&self) -> &'static str {
        "flows"
    }

    async fn read(&self, ctx: &ReaderContext<'_>) -> Result<(), ReaderError> {
        let request = QueryRequest::tooling("FlowDefinition", &["DeveloperName", "NamespacePrefix"])
            .with_filter(ctx.namespace_filter(None));
        let records: Vec<FlowDefinitionRecord> = query_as(ctx.source, &request).await?;
        let groups = group_by_namespace(records);
        let staged = stage_each(ctx, &groups, ArtifactKind::Flow, |f| {
            (f.developer_name.as_str(), "")
        });
        tracing::info!(count = staged.values().sum::<usize>(), "staged flows");
        Ok(())
    }
}
