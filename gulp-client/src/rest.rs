//! REST endpoints and response shapes.
//!
//! ```text
//! {instance}/services/data/v{ver}/query?q=...            data query
//! {instance}/services/data/v{ver}/tooling/query?q=...    tooling query
//! {instance}/services/data/v{ver}/sobjects               describe global
//! {instance}/services/data/v{ver}/sobjects/{name}/describe
//! {instance}/services/Soap/m/{ver}                       metadata SOAP
//! ```

use serde::Deserialize;

use gulp_core::{QueryApi, Record};

/// One page of a query result.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub next_records_url: Option<String>,
    #[serde(default)]
    pub records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
pub struct DescribeGlobal {
    #[serde(default)]
    pub sobjects: Vec<GlobalSObject>,
}

#[derive(Debug, Deserialize)]
pub struct GlobalSObject {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
}

/// Base URLs for one org and API version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    instance_url: String,
    api_version: String,
}

impl Endpoints {
    pub fn new(instance_url: &str, api_version: &str) -> Self {
        Self {
            instance_url: instance_url.trim_end_matches('/').to_string(),
            api_version: api_version.trim_start_matches('v').to_string(),
        }
    }

    fn data_root(&self) -> String {
        format!("{}/services/data/v{}", self.instance_url, self.api_version)
    }

    pub fn query(&self, api: QueryApi) -> String {
        match api {
            QueryApi::Data => format!("{}/query", self.data_root()),
            QueryApi::Tooling => format!("{}/tooling/query", self.data_root()),
        }
    }

    pub fn describe_global(&self) -> String {
        format!("{}/sobjects", self.data_root())
    }

    pub fn describe(&self, sobject: &str) -> String {
        format!("{}/sobjects/{sobject}/describe", self.data_root())
    }

    pub fn metadata_soap(&self) -> String {
        format!("{}/services/Soap/m/{}", self.instance_url, self.api_version)
    }

    /// `nextRecordsUrl` values are instance-relative.
    pub fn absolute(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{path}", self.instance_url)
        }
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }
}

/// Human-readable message from a REST error body.
///
/// The API answers errors with `[{"message": ..., "errorCode": ...}]`;
/// anything else is returned as-is.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<Vec<RestError>>(body) {
        Ok(errors) if !errors.is_empty() => errors
            .into_iter()
            .map(|e| match (e.error_code, e.message) {
                (Some(code), Some(message)) => format!("{code}: {message}"),
                (None, Some(message)) => message,
                (Some(code), None) => code,
                (None, None) => "unknown error".to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.trim().to_string(),
    }
}

/// Drop the per-record `attributes` envelope.
pub fn strip_attributes(mut record: Record) -> Record {
    record.remove("attributes");
    record
}
