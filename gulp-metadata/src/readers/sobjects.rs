//! Custom objects and their fields.
//!
//! Objects are pulled per partition: the org's own objects (published as
//! `<local>`) plus one partition per working namespace. For each partition
//! the object names are listed, the definitions bulk-retrieved, enriched
//! with attributes the retrieve omits, and split so that every field lands
//! in the directory of the namespace that owns it.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use futures::future::{join_all, try_join, try_join_all};
use serde::Deserialize;

use gulp_core::{query_as, soql_literal, target_directory, EntityName, Namespace, QueryRequest};
use gulp_renderer::{field_path, ArtifactKind};

use super::{MetadataReader, ReaderContext};
use crate::archive::{object_definitions, ObjectDefinition};
use crate::error::ReaderError;
use crate::object_doc::ObjectDocument;

const ENTITY_DEFINITION: &str = "EntityDefinition";
const CUSTOM_OBJECT: &str = "CustomObject";
const LOCAL_PUBLISHER: &str = "Publisher.Name = '<local>'";

/// Which objects a retrieve covers and where they land.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Partition {
    Local,
    Managed(Namespace),
}

impl Partition {
    fn filter(&self) -> String {
        match self {
            Partition::Local => LOCAL_PUBLISHER.to_string(),
            Partition::Managed(ns) => format!("NamespacePrefix = {}", soql_literal(ns.as_str())),
        }
    }

    /// Namespace that owns the partition's objects.
    fn owner<'a>(&'a self, home: Option<&'a Namespace>) -> Option<&'a Namespace> {
        match self {
            Partition::Local => home,
            Partition::Managed(ns) => Some(ns),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EntityNameRecord {
    qualified_api_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EntityAttributesRecord {
    qualified_api_name: String,
    #[serde(default)]
    internal_sharing_model: Option<String>,
    #[serde(default)]
    is_custom_setting: bool,
}

/// Shape of a custom setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomSettingsType {
    List,
    Hierarchy,
}

impl CustomSettingsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomSettingsType::List => "List",
            CustomSettingsType::Hierarchy => "Hierarchy",
        }
    }
}

/// Attributes merged into a retrieved object definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectAttributes {
    pub sharing_model: Option<String>,
    pub custom_settings_type: Option<CustomSettingsType>,
}

/// Map an internal sharing model to the value object metadata uses.
pub fn public_sharing_model(internal: &str) -> &str {
    match internal {
        "None" => "Private",
        "Edit" => "ReadWrite",
        other => other,
    }
}

/// Apply `attributes` to `document`, keeping values the document already has.
pub fn enrich(document: &mut ObjectDocument, attributes: &ObjectAttributes) {
    if let Some(sharing_model) = &attributes.sharing_model {
        document.ensure_child_text("sharingModel", sharing_model);
    }
    if let Some(settings_type) = attributes.custom_settings_type {
        document.ensure_child_text("customSettingsType", settings_type.as_str());
    }
}

/// Custom objects, plus fields other namespaces added to them.
pub struct SObjectReader;

#[async_trait]
impl MetadataReader for SObjectReader {
    fn name(&self) -> &'static str {
        "sobjects"
    }

    async fn read(&self, ctx: &ReaderContext<'_>) -> Result<(), ReaderError> {
        let mut partitions = vec![Partition::Local];
        partitions.extend(ctx.namespaces.iter().cloned().map(Partition::Managed));
        try_join_all(partitions.iter().map(|p| read_partition(ctx, p))).await?;
        Ok(())
    }
}

async fn read_partition(ctx: &ReaderContext<'_>, partition: &Partition) -> Result<(), ReaderError> {
    let names = object_names(ctx, partition).await?;
    if names.is_empty() {
        tracing::debug!(partition = ?partition, "no objects to retrieve");
        return Ok(());
    }

    let members: Vec<String> = names.iter().map(EntityName::full_name).collect();
    let retrieve = async {
        let archive = ctx.source.retrieve(CUSTOM_OBJECT, &members).await?;
        object_definitions(&archive)
    };
    let (definitions, attributes) = try_join(retrieve, object_attributes(ctx, partition)).await?;

    let owner = partition.owner(ctx.home);
    let mut fields = 0;
    for definition in &definitions {
        fields += stage_object(ctx, owner, definition, &attributes)?;
    }
    tracing::info!(
        namespace = target_directory(owner),
        objects = definitions.len(),
        fields,
        "staged objects"
    );
    Ok(())
}

/// Stage one object and its alien fields; returns the number of fields staged.
fn stage_object(
    ctx: &ReaderContext<'_>,
    owner: Option<&Namespace>,
    definition: &ObjectDefinition,
    attributes: &HashMap<String, ObjectAttributes>,
) -> Result<usize, ReaderError> {
    let document_error = |source| ReaderError::Document {
        name: definition.name.clone(),
        source,
    };

    let mut document = ObjectDocument::parse(&definition.contents).map_err(document_error)?;
    if let Some(attributes) = attributes.get(&definition.name) {
        enrich(&mut document, attributes);
    }
    let split = document
        .split_alien_fields(owner, ctx.home)
        .map_err(document_error)?;

    ctx.store.stage(
        ArtifactKind::Object.path(target_directory(owner), &definition.name),
        split.object.to_xml(),
    );

    let mut staged = 0;
    for field in &split.alien_fields {
        let field_owner = field.name.namespace.as_ref();
        if !ctx.is_processed(field_owner) {
            tracing::debug!(object = %definition.name, field = %field.name, "skipping field of unrequested namespace");
            continue;
        }
        ctx.store.stage(
            field_path(target_directory(field_owner), &definition.name, &field.name.full_name()),
            field.to_xml(),
        );
        staged += 1;
    }
    Ok(staged)
}

async fn object_names(
    ctx: &ReaderContext<'_>,
    partition: &Partition,
) -> Result<Vec<EntityName>, ReaderError> {
    let request = QueryRequest::tooling(ENTITY_DEFINITION, &["QualifiedApiName"])
        .with_filter(partition.filter());
    let records: Vec<EntityNameRecord> = query_as(ctx.source, &request).await?;
    Ok(records
        .iter()
        .filter_map(|r| EntityName::parse_object(&r.qualified_api_name))
        .collect())
}

async fn object_attributes(
    ctx: &ReaderContext<'_>,
    partition: &Partition,
) -> Result<HashMap<String, ObjectAttributes>, ReaderError> {
    let request = QueryRequest::tooling(
        ENTITY_DEFINITION,
        &["QualifiedApiName", "InternalSharingModel", "IsCustomSetting"],
    )
    .with_filter(partition.filter());
    let records: Vec<EntityAttributesRecord> = query_as(ctx.source, &request).await?;

    let settings_types = custom_settings_types(ctx, &records).await?;

    Ok(records
        .into_iter()
        .map(|record| {
            let attributes = if record.is_custom_setting {
                ObjectAttributes {
                    sharing_model: None,
                    custom_settings_type: settings_types.get(&record.qualified_api_name).copied(),
                }
            } else {
                ObjectAttributes {
                    sharing_model: record
                        .internal_sharing_model
                        .as_deref()
                        .filter(|m| !m.is_empty())
                        .map(|m| public_sharing_model(m).to_string()),
                    custom_settings_type: None,
                }
            };
            (record.qualified_api_name, attributes)
        })
        .collect())
}

/// Describe every visible custom setting in `records`, concurrently.
async fn custom_settings_types(
    ctx: &ReaderContext<'_>,
    records: &[EntityAttributesRecord],
) -> Result<HashMap<String, CustomSettingsType>, ReaderError> {
    let settings: Vec<&str> = records
        .iter()
        .filter(|r| r.is_custom_setting)
        .map(|r| r.qualified_api_name.as_str())
        .collect();
    if settings.is_empty() {
        return Ok(HashMap::new());
    }

    let visible: HashSet<String> = ctx.source.describe_global().await?.into_iter().collect();
    let describes = join_all(
        settings
            .into_iter()
            .filter(|name| visible.contains(*name))
            .map(|name| async move { (name, ctx.source.describe(name).await) }),
    )
    .await;

    let mut types = HashMap::new();
    for (name, describe) in describes {
        let describe = describe?;
        let settings_type = match describe.field("Name") {
            Some(field) if field.nillable => CustomSettingsType::Hierarchy,
            _ => CustomSettingsType::List,
        };
        types.insert(name.to_string(), settings_type);
    }
    Ok(types)
}
