//! Metadata API SOAP envelopes and response parsing.

use std::collections::{HashMap, HashSet};

use base64::Engine;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ClientError;

const ENVELOPE_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:met="http://soap.sforce.com/2006/04/metadata">"#;

/// Outcome of one `checkRetrieveStatus` poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrieveStatus {
    Pending,
    /// Decoded zip archive.
    Succeeded(Vec<u8>),
    Failed(String),
}

fn envelope(session_id: &str, body: &str) -> String {
    format!(
        "{ENVELOPE_OPEN}\
<soapenv:Header><met:SessionHeader><met:sessionId>{}</met:sessionId></met:SessionHeader></soapenv:Header>\
<soapenv:Body>{body}</soapenv:Body>\
</soapenv:Envelope>",
        escape(session_id)
    )
}

/// `retrieve` of `members` of `type_name` as a single unpackaged package.
pub fn retrieve_request(
    session_id: &str,
    api_version: &str,
    type_name: &str,
    members: &[String],
) -> String {
    let members: String = members
        .iter()
        .map(|m| format!("<met:members>{}</met:members>", escape(m.as_str())))
        .collect();
    let body = format!(
        "<met:retrieve><met:retrieveRequest>\
<met:apiVersion>{version}</met:apiVersion>\
<met:singlePackage>true</met:singlePackage>\
<met:unpackaged><met:types>{members}<met:name>{name}</met:name></met:types>\
<met:version>{version}</met:version></met:unpackaged>\
</met:retrieveRequest></met:retrieve>",
        version = escape(api_version),
        name = escape(type_name),
    );
    envelope(session_id, &body)
}

pub fn check_retrieve_status_request(session_id: &str, process_id: &str) -> String {
    let body = format!(
        "<met:checkRetrieveStatus>\
<met:asyncProcessId>{}</met:asyncProcessId>\
<met:includeZip>true</met:includeZip>\
</met:checkRetrieveStatus>",
        escape(process_id)
    );
    envelope(session_id, &body)
}

/// Async process id from a `retrieve` response.
pub fn parse_retrieve_id(body: &str) -> Result<String, ClientError> {
    let texts = first_texts(body, &["id", "faultstring"])?;
    if let Some(fault) = texts.get("faultstring") {
        return Err(ClientError::Fault(fault.trim().to_string()));
    }
    texts
        .get("id")
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ClientError::Soap("retrieve response has no id".to_string()))
}

pub fn parse_retrieve_status(body: &str) -> Result<RetrieveStatus, ClientError> {
    let texts = first_texts(
        body,
        &["done", "status", "zipFile", "errorMessage", "problem", "faultstring"],
    )?;
    if let Some(fault) = texts.get("faultstring") {
        return Err(ClientError::Fault(fault.trim().to_string()));
    }

    let done = texts.get("done").is_some_and(|d| d.trim() == "true");
    if !done {
        return Ok(RetrieveStatus::Pending);
    }

    let status = texts.get("status").map(|s| s.trim()).unwrap_or_default();
    if status != "Succeeded" {
        let message = texts
            .get("errorMessage")
            .or_else(|| texts.get("problem"))
            .map(|m| m.trim().to_string())
            .unwrap_or_else(|| format!("retrieve finished with status {status:?}"));
        return Ok(RetrieveStatus::Failed(message));
    }

    let encoded: String = texts
        .get("zipFile")
        .ok_or_else(|| ClientError::Soap("succeeded retrieve has no zipFile".to_string()))?
        .split_whitespace()
        .collect();
    let archive = base64::engine::general_purpose::STANDARD.decode(encoded)?;
    Ok(RetrieveStatus::Succeeded(archive))
}

/// `faultstring` of a SOAP fault body, if it is one.
pub fn parse_fault(body: &str) -> Option<String> {
    first_texts(body, &["faultstring"])
        .ok()?
        .remove("faultstring")
        .map(|f| f.trim().to_string())
}

/// Text of the first element with each local name in `wanted`.
fn first_texts(body: &str, wanted: &[&str]) -> Result<HashMap<String, String>, ClientError> {
    let mut reader = Reader::from_str(body);
    let mut open: Vec<String> = Vec::new();
    let mut found: HashMap<String, String> = HashMap::new();
    let mut closed: HashSet<String> = HashSet::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                open.push(name);
            }
            Event::End(_) => {
                if let Some(name) = open.pop() {
                    if found.contains_key(&name) {
                        closed.insert(name);
                    }
                }
            }
            Event::Text(text) => {
                if let Some(name) = open.last() {
                    if wanted.contains(&name.as_str()) && !closed.contains(name) {
                        found
                            .entry(name.clone())
                            .or_default()
                            .push_str(&text.unescape()?);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(found)
}
