#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use gulp_core::{
    FieldDescribe, Namespace, QueryRequest, Record, RemoteSource, SObjectDescribe, SourceError,
};
use gulp_metadata::{Failure, MetadataReader, ReaderContext};
use gulp_sync::walk::files_under;
use gulp_sync::StubFs;

/// In-memory org.
///
/// Query filters are honoured just enough to check namespace scoping: a row
/// matches when the filter names its `NamespacePrefix`, when it is unmanaged
/// and the filter asks for `NamespacePrefix = null`, or when it is published
/// locally (`Publisher.Name`) and the filter asks for `<local>`.
#[derive(Default)]
pub struct FakeSource {
    records: HashMap<String, Vec<Record>>,
    failing: HashSet<String>,
    objects: HashMap<String, String>,
    describes: HashMap<String, SObjectDescribe>,
    pub queries: Mutex<Vec<QueryRequest>>,
    pub retrieves: Mutex<Vec<Vec<String>>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// An org whose own namespace is `prefix`.
    pub fn with_home(self, prefix: &str) -> Self {
        self.with_record("Organization", json!({ "NamespacePrefix": prefix }))
    }

    pub fn with_record(mut self, sobject: &str, record: Value) -> Self {
        let Value::Object(map) = record else {
            panic!("records must be JSON objects");
        };
        self.records.entry(sobject.to_string()).or_default().push(map);
        self
    }

    pub fn with_class(self, ns: Option<&str>, name: &str, body: &str) -> Self {
        self.with_record(
            "ApexClass",
            json!({ "Name": name, "Body": body, "NamespacePrefix": ns }),
        )
    }

    pub fn with_page(self, ns: Option<&str>, name: &str, markup: &str) -> Self {
        self.with_record(
            "ApexPage",
            json!({ "Name": name, "Markup": markup, "NamespacePrefix": ns }),
        )
    }

    pub fn with_component(self, ns: Option<&str>, name: &str, markup: &str) -> Self {
        self.with_record(
            "ApexComponent",
            json!({ "Name": name, "Markup": markup, "NamespacePrefix": ns }),
        )
    }

    pub fn with_flow(self, ns: Option<&str>, name: &str) -> Self {
        self.with_record(
            "FlowDefinition",
            json!({ "DeveloperName": name, "NamespacePrefix": ns }),
        )
    }

    pub fn with_label(self, ns: Option<&str>, name: &str) -> Self {
        self.with_record(
            "ExternalString",
            json!({ "Name": name, "NamespacePrefix": ns }),
        )
    }

    /// A custom object with its retrievable definition. `local` objects are
    /// published by the org itself.
    pub fn with_object(mut self, ns: Option<&str>, local: bool, name: &str, xml: &str) -> Self {
        self.objects.insert(name.to_string(), xml.to_string());
        self.with_entity(ns, local, name, "ReadWrite", false)
    }

    pub fn with_entity(
        self,
        ns: Option<&str>,
        local: bool,
        name: &str,
        sharing: &str,
        custom_setting: bool,
    ) -> Self {
        let publisher = if local { "<local>" } else { "Managed Publisher" };
        self.with_record(
            "EntityDefinition",
            json!({
                "QualifiedApiName": name,
                "NamespacePrefix": ns,
                "Publisher": { "Name": publisher },
                "InternalSharingModel": sharing,
                "IsCustomSetting": custom_setting,
            }),
        )
    }

    pub fn with_definition(mut self, name: &str, xml: &str) -> Self {
        self.objects.insert(name.to_string(), xml.to_string());
        self
    }

    pub fn with_describe(mut self, name: &str, name_nillable: bool) -> Self {
        self.describes.insert(
            name.to_string(),
            SObjectDescribe {
                name: name.to_string(),
                fields: vec![FieldDescribe {
                    name: "Name".to_string(),
                    nillable: name_nillable,
                }],
            },
        );
        self
    }

    /// Every query against `sobject` fails.
    pub fn failing_on(mut self, sobject: &str) -> Self {
        self.failing.insert(sobject.to_string());
        self
    }

    pub fn queried(&self) -> Vec<QueryRequest> {
        self.queries.lock().unwrap().clone()
    }

    pub fn retrieved(&self) -> Vec<Vec<String>> {
        self.retrieves.lock().unwrap().clone()
    }
}

fn matches_filter(record: &Record, filter: Option<&str>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    let local = record
        .get("Publisher")
        .and_then(|p| p.get("Name"))
        .and_then(Value::as_str)
        == Some("<local>");
    if local && filter.contains("Publisher.Name = '<local>'") {
        return true;
    }
    match record.get("NamespacePrefix").and_then(Value::as_str) {
        Some(ns) => filter.contains(&format!("NamespacePrefix = '{ns}'")),
        None => filter.contains("NamespacePrefix = null"),
    }
}

#[async_trait]
impl RemoteSource for FakeSource {
    async fn query(&self, request: &QueryRequest) -> Result<Vec<Record>, SourceError> {
        self.queries.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.sobject) {
            return Err(SourceError::Rejected {
                status: 500,
                message: format!("{} is unavailable", request.sobject),
            });
        }
        Ok(self
            .records
            .get(&request.sobject)
            .map(|rows| {
                rows.iter()
                    .filter(|r| matches_filter(r, request.filter.as_deref()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn retrieve(&self, type_name: &str, members: &[String]) -> Result<Vec<u8>, SourceError> {
        assert_eq!(type_name, "CustomObject");
        self.retrieves.lock().unwrap().push(members.to_vec());
        let entries: Vec<(String, String)> = members
            .iter()
            .filter_map(|m| {
                self.objects
                    .get(m)
                    .map(|xml| (format!("unpackaged/objects/{m}.object"), xml.clone()))
            })
            .collect();
        Ok(zip_archive(&entries))
    }

    async fn describe_global(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.describes.keys().cloned().collect())
    }

    async fn describe(&self, sobject: &str) -> Result<SObjectDescribe, SourceError> {
        self.describes
            .get(sobject)
            .cloned()
            .ok_or_else(|| SourceError::Shape(format!("no describe for {sobject}")))
    }
}

pub fn zip_archive(entries: &[(String, String)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("unpackaged/package.xml", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"<Package/>").unwrap();
    for (name, contents) in entries {
        writer
            .start_file(name.as_str(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Every file under `root`, keyed by root-relative path.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
    files_under(root)
        .unwrap()
        .into_iter()
        .map(|path| {
            let contents = std::fs::read_to_string(&path).unwrap();
            (path.strip_prefix(root).unwrap().to_path_buf(), contents)
        })
        .collect()
}

pub fn object_xml(fields: &[&str]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<CustomObject xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n",
    );
    for field in fields {
        xml.push_str(&format!(
            "    <fields>\n        <fullName>{field}</fullName>\n        <type>Text</type>\n    </fields>\n"
        ));
    }
    xml.push_str("    <label>Thing</label>\n</CustomObject>\n");
    xml
}

/// One reader run against a fresh store.
pub struct Harness {
    pub workspace: TempDir,
    pub store: StubFs,
    pub home: Option<Namespace>,
    pub namespaces: BTreeSet<Namespace>,
}

impl Harness {
    pub fn new(home: Option<&str>, working: &[&str]) -> Self {
        let workspace = TempDir::new().unwrap();
        let store = StubFs::open(workspace.path()).unwrap();
        Self {
            workspace,
            store,
            home: home.map(Namespace::from),
            namespaces: working.iter().map(|n| Namespace::from(*n)).collect(),
        }
    }

    pub async fn run(&self, reader: &dyn MetadataReader, source: &FakeSource) -> Option<Failure> {
        let ctx = ReaderContext {
            source,
            home: self.home.as_ref(),
            namespaces: &self.namespaces,
            store: &self.store,
        };
        reader.run(&ctx).await
    }

    pub fn staged(&self, path: &str) -> Option<String> {
        self.store.staged(Path::new(path))
    }

    pub fn staged_paths(&self) -> Vec<String> {
        self.store
            .staged_paths()
            .iter()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect()
    }
}
