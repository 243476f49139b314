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
struct ApexClassRecord {
    name: String,
    #[serde(default)]
    body: String,
    namespace_prefix: Option<String>,
}

impl NamespacedRecord for ApexClassRecord {
    fn namespace_prefix(&self) -> Option<&str> {
        self.namespace_prefix.as_deref()
    }

    fn is_hidden(&self) -> bool {
        self.body == HIDDEN_SENTINEL
    }
}

/// Active Apex classes, one `classes/<Name>.cls` per class.
pub struct ClassReader;

#[async_trait]
impl MetadataReader for ClassReader {
    fn name(&self) -> &'static str {
        "classes"
    }

    async fn read(&self, ctx: &ReaderContext<'_>) -> Result<(), ReaderError> {
        let request = QueryRequest::tooling("ApexClass", &["Name", "Body", "NamespacePrefix"])
            .with_filter(format!("Status = 'Active' AND ({})", ctx.namespace_filter(None)));
        let records: Vec<ApexClassRecord> = query_as(ctx.source, &request).await?;
        let groups = group_by_namespace(records);
        let staged = stage_each(ctx, &groups, ArtifactKind::Class, |c| {
            (c.name.as_str(), c.body.as_str())
        });
        tracing::info!(count = staged.values().sum::<usize>(), "staged classes");
        Ok(())
    }
}
