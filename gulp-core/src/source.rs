//! Remote-source contract.
//!
//! The core never talks to the network itself; callers hand it something that
//! implements [`RemoteSource`]. Connection and session setup are the
//! implementor's business.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Upper bound on records fetched per query.
pub const MAX_FETCH: usize = 100_000;

/// A single query result row, as returned by the remote API.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Which query surface a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryApi {
    /// Regular data API (e.g. `Organization`).
    Data,
    /// Tooling API (metadata-backed record types).
    Tooling,
}

/// A filtered select over one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub api: QueryApi,
    pub sobject: String,
    pub fields: Vec<String>,
    pub filter: Option<String>,
    pub max_fetch: usize,
}

impl QueryRequest {
    /// Tooling-API query for `fields` of `sobject`.
    pub fn tooling(sobject: &str, fields: &[&str]) -> Self {
        Self {
            api: QueryApi::Tooling,
            sobject: sobject.to_string(),
            fields: fields.iter().map(|f| (*f).to_string()).collect(),
            filter: None,
            max_fetch: MAX_FETCH,
        }
    }

    /// Data-API query for `fields` of `sobject`.
    pub fn data(sobject: &str, fields: &[&str]) -> Self {
        Self {
            api: QueryApi::Data,
            ..Self::tooling(sobject, fields)
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Render as a SOQL statement.
    pub fn soql(&self) -> String {
        let mut soql = format!("SELECT {} FROM {}", self.fields.join(", "), self.sobject);
        if let Some(filter) = &self.filter {
            soql.push_str(" WHERE ");
            soql.push_str(filter);
        }
        soql
    }
}

/// Quote a value as a SOQL string literal.
pub fn soql_literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Field-level describe information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescribe {
    pub name: String,
    #[serde(default)]
    pub nillable: bool,
}

/// Describe-style result for one record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SObjectDescribe {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDescribe>,
}

impl SObjectDescribe {
    pub fn field(&self, name: &str) -> Option<&FieldDescribe> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Everything the metadata readers need from the remote organization.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Every record of `request.sobject` matching the filter, fully paged up to
    /// `request.max_fetch`.
    async fn query(&self, request: &QueryRequest) -> Result<Vec<Record>, SourceError>;

    /// Bulk metadata retrieve: a zip archive with one definition document per
    /// member of `type_name`.
    async fn retrieve(&self, type_name: &str, members: &[String]) -> Result<Vec<u8>, SourceError>;

    /// Names of every record type visible to the caller.
    async fn describe_global(&self) -> Result<Vec<String>, SourceError>;

    /// Field-level describe of one record type.
    async fn describe(&self, sobject: &str) -> Result<SObjectDescribe, SourceError>;
}

/// Run `request` and decode every record into `T`.
pub async fn query_as<T: DeserializeOwned>(
    source: &dyn RemoteSource,
    request: &QueryRequest,
) -> Result<Vec<T>, SourceError> {
    let records = source.query(request).await?;
    records
        .into_iter()
        .map(|record| {
            serde_json::from_value(serde_json::Value::Object(record)).map_err(SourceError::from)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soql_includes_filter_when_present() {
        let request = QueryRequest::tooling("ApexClass", &["Name", "Body"])
            .with_filter("NamespacePrefix = null");
        assert_eq!(
            request.soql(),
            "SELECT Name, Body FROM ApexClass WHERE NamespacePrefix = null"
        );
        assert_eq!(request.api, QueryApi::Tooling);
        assert_eq!(request.max_fetch, MAX_FETCH);
    }

    #[test]
    fn soql_without_filter() {
        let request = QueryRequest::data("Organization", &["NamespacePrefix"]);
        assert_eq!(request.soql(), "SELECT NamespacePrefix FROM Organization");
        assert_eq!(request.api, QueryApi::Data);
    }

    #[test]
    fn literal_escapes_quotes() {
        assert_eq!(soql_literal("ns"), "'ns'");
        assert_eq!(soql_literal("o'k"), "'o\\'k'");
    }

    #[test]
    fn describe_field_lookup() {
        let describe: SObjectDescribe = serde_json::from_str(
            r#"{"name":"Setting__c","fields":[{"name":"Name","nillable":true,"length":80}]}"#,
        )
        .expect("decode");
        assert!(describe.field("Name").expect("Name").nillable);
        assert!(describe.field("Other").is_none());
    }
}
