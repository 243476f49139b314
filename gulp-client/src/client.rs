//! Blocking `ureq` calls behind the async [`RemoteSource`] contract.

use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use gulp_core::{
    ConfigError, GulpConfig, QueryRequest, Record, RemoteSource, SObjectDescribe, SourceError,
};

use crate::error::ClientError;
use crate::rest::{error_message, strip_attributes, DescribeGlobal, Endpoints, QueryPage};
use crate::soap::{self, RetrieveStatus};

/// Connection settings for one org.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub instance_url: String,
    pub access_token: String,
    pub api_version: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

impl ClientSettings {
    pub fn from_config(config: &GulpConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            instance_url: config.require_instance_url()?.to_string(),
            access_token: config.require_access_token()?.to_string(),
            api_version: config.api_version.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
        })
    }
}

struct Inner {
    agent: ureq::Agent,
    endpoints: Endpoints,
    settings: ClientSettings,
}

/// REST + metadata SOAP client for one org.
#[derive(Clone)]
pub struct SalesforceClient {
    inner: Arc<Inner>,
}

impl SalesforceClient {
    pub fn new(settings: ClientSettings) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(settings.request_timeout)
            .build();
        let endpoints = Endpoints::new(&settings.instance_url, &settings.api_version);
        Self {
            inner: Arc::new(Inner {
                agent,
                endpoints,
                settings,
            }),
        }
    }

    pub fn instance_url(&self) -> &str {
        &self.inner.settings.instance_url
    }

    /// Run `f` on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T, ClientError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T, ClientError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner)).await?
    }

    async fn retrieve_archive(
        &self,
        type_name: String,
        members: Vec<String>,
    ) -> Result<Vec<u8>, ClientError> {
        let count = members.len();
        let process_id = self
            .blocking(move |inner| inner.start_retrieve(&type_name, &members))
            .await?;
        tracing::info!(%process_id, members = count, "metadata retrieve started");

        let started = Instant::now();
        let poll_interval = self.inner.settings.poll_interval;
        let poll_timeout = self.inner.settings.poll_timeout;
        loop {
            let id = process_id.clone();
            match self.blocking(move |inner| inner.check_retrieve(&id)).await? {
                RetrieveStatus::Succeeded(archive) => {
                    tracing::info!(%process_id, bytes = archive.len(), "metadata retrieve finished");
                    return Ok(archive);
                }
                RetrieveStatus::Failed(message) => return Err(ClientError::Retrieve(message)),
                RetrieveStatus::Pending => {}
            }
            if started.elapsed() >= poll_timeout {
                return Err(ClientError::Timeout(poll_timeout));
            }
            tracing::debug!(%process_id, "metadata retrieve pending");
            tokio::time::sleep(poll_interval).await;
        }
    }
}

impl Inner {
    fn bearer(&self) -> String {
        format!("Bearer {}", self.settings.access_token)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: Option<(&str, &str)>,
    ) -> Result<T, ClientError> {
        tracing::debug!("GET {url}");
        let mut request = self
            .agent
            .get(url)
            .set("Authorization", &self.bearer())
            .set("Accept", "application/json");
        if let Some((key, value)) = query {
            request = request.query(key, value);
        }
        let response = handle(url, request.call())?;
        response.into_json().map_err(|e| ClientError::Body {
            endpoint: url.to_string(),
            message: e.to_string(),
        })
    }

    fn query_all(&self, request: &QueryRequest) -> Result<Vec<Record>, ClientError> {
        let soql = request.soql();
        tracing::debug!(%soql, "query");
        let first = self.endpoints.query(request.api);
        let mut page: QueryPage = self.get_json(&first, Some(("q", &soql)))?;
        let mut records: Vec<Record> = Vec::new();

        loop {
            records.extend(page.records.into_iter().map(strip_attributes));
            let next = if page.done { None } else { page.next_records_url };
            if is_truncated(records.len(), request.max_fetch, next.is_some()) {
                records.truncate(request.max_fetch);
                tracing::warn!(sobject = %request.sobject, limit = request.max_fetch, "query truncated");
                break;
            }
            match next {
                Some(next) => {
                    page = self.get_json(&self.endpoints.absolute(&next), None)?;
                }
                None => break,
            }
        }
        Ok(records)
    }

    fn post_soap(&self, action: &str, envelope: String) -> Result<String, ClientError> {
        let url = self.endpoints.metadata_soap();
        tracing::debug!("POST {url} ({action})");
        let result = self
            .agent
            .post(&url)
            .set("Content-Type", "text/xml; charset=UTF-8")
            .set("SOAPAction", action)
            .send_string(&envelope);
        let response = match result {
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(match soap::parse_fault(&body) {
                    Some(fault) => ClientError::Fault(fault),
                    None => ClientError::Status {
                        endpoint: url,
                        status,
                        message: body.trim().to_string(),
                    },
                });
            }
            other => handle(&url, other)?,
        };
        // Retrieve results carry the whole archive; `into_string` caps at 10 MB.
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|e| ClientError::Body {
                endpoint: url,
                message: e.to_string(),
            })?;
        Ok(body)
    }

    fn start_retrieve(&self, type_name: &str, members: &[String]) -> Result<String, ClientError> {
        let envelope = soap::retrieve_request(
            &self.settings.access_token,
            self.endpoints.api_version(),
            type_name,
            members,
        );
        let body = self.post_soap("retrieve", envelope)?;
        soap::parse_retrieve_id(&body)
    }

    fn check_retrieve(&self, process_id: &str) -> Result<RetrieveStatus, ClientError> {
        let envelope = soap::check_retrieve_status_request(&self.settings.access_token, process_id);
        let body = self.post_soap("checkRetrieveStatus", envelope)?;
        soap::parse_retrieve_status(&body)
    }
}

/// Whether rows past `max_fetch` were fetched or are still on the server.
fn is_truncated(fetched: usize, max_fetch: usize, more: bool) -> bool {
    fetched > max_fetch || (fetched == max_fetch && more)
}

/// Turn a `ureq` outcome into a response or a [`ClientError`].
fn handle(
    endpoint: &str,
    result: Result<ureq::Response, ureq::Error>,
) -> Result<ureq::Response, ClientError> {
    match result {
        Ok(response) => Ok(response),
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(ClientError::Status {
                endpoint: endpoint.to_string(),
                status,
                message: error_message(&body),
            })
        }
        Err(ureq::Error::Transport(transport)) => Err(ClientError::Transport {
            endpoint: endpoint.to_string(),
            message: transport.to_string(),
        }),
    }
}

#[async_trait]
impl RemoteSource for SalesforceClient {
    async fn query(&self, request: &QueryRequest) -> Result<Vec<Record>, SourceError> {
        let request = request.clone();
        let records = self.blocking(move |inner| inner.query_all(&request)).await?;
        Ok(records)
    }

    async fn retrieve(&self, type_name: &str, members: &[String]) -> Result<Vec<u8>, SourceError> {
        Ok(self
            .retrieve_archive(type_name.to_string(), members.to_vec())
            .await?)
    }

    async fn describe_global(&self) -> Result<Vec<String>, SourceError> {
        let global: DescribeGlobal = self
            .blocking(|inner| inner.get_json(&inner.endpoints.describe_global(), None))
            .await?;
        Ok(global.sobjects.into_iter().map(|s| s.name).collect())
    }

    async fn describe(&self, sobject: &str) -> Result<SObjectDescribe, SourceError> {
        let sobject = sobject.to_string();
        Ok(self
            .blocking(move |inner| inner.get_json(&inner.endpoints.describe(&sobject), None))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::Mutex;

    use base64::Engine;
    use rstest::rstest;

    use super::*;

    /// Loopback HTTP server answering one canned body per connection, in
    /// order. Returns the instance URL and the request lines it saw.
    fn serve(bodies: Vec<String>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let url = format!("http://{}", listener.local_addr().expect("addr"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        std::thread::spawn(move || {
            for (body, stream) in bodies.into_iter().zip(listener.incoming()) {
                let mut stream = stream.expect("accept");
                let line = read_request(&stream).expect("request");
                log.lock().unwrap().push(line);
                let content_type = if body.starts_with('<') {
                    "text/xml"
                } else {
                    "application/json"
                };
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                )
                .expect("respond");
            }
        });
        (url, seen)
    }

    /// Consume one request and return its request line.
    fn read_request(stream: &TcpStream) -> std::io::Result<String> {
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line)?;
        let mut length = 0;
        loop {
            let mut header = String::new();
            reader.read_line(&mut header)?;
            let header = header.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    length = value.trim().parse().unwrap_or(0);
                }
            }
        }
        let mut body = vec![0; length];
        std::io::Read::read_exact(&mut reader, &mut body)?;
        Ok(request_line.trim_end().to_string())
    }

    fn client_for(url: &str, poll_timeout: Duration) -> SalesforceClient {
        SalesforceClient::new(ClientSettings {
            instance_url: url.to_string(),
            access_token: "token".into(),
            api_version: "58.0".into(),
            request_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(10),
            poll_timeout,
        })
    }

    fn page(names: &[&str], next: Option<&str>) -> String {
        let records: Vec<serde_json::Value> = names
            .iter()
            .map(|n| serde_json::json!({ "attributes": { "type": "ApexClass" }, "Name": n }))
            .collect();
        serde_json::json!({
            "totalSize": names.len(),
            "done": next.is_none(),
            "nextRecordsUrl": next,
            "records": records,
        })
        .to_string()
    }

    fn retrieve_result(result: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns="http://soap.sforce.com/2006/04/metadata"><soapenv:Body><response><result>{result}</result></response></soapenv:Body></soapenv:Envelope>"#
        )
    }

    fn names(records: &[Record]) -> Vec<&str> {
        records.iter().filter_map(|r| r["Name"].as_str()).collect()
    }

    fn config() -> GulpConfig {
        GulpConfig {
            instance_url: Some("https://acme.my.salesforce.com".into()),
            access_token: Some("token".into()),
            poll_interval_secs: 5,
            ..GulpConfig::default()
        }
    }

    #[test]
    fn settings_come_from_config() {
        let settings = ClientSettings::from_config(&config()).expect("settings");
        assert_eq!(settings.api_version, "58.0");
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.poll_timeout, Duration::from_secs(600));
        assert_eq!(settings.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn missing_token_is_a_config_error() {
        let config = GulpConfig {
            access_token: None,
            ..config()
        };
        assert!(matches!(
            ClientSettings::from_config(&config),
            Err(ConfigError::Missing("access_token"))
        ));
    }

    #[tokio::test]
    async fn query_follows_next_records_url() {
        let (url, seen) = serve(vec![
            page(&["A", "B"], Some("/services/data/v58.0/tooling/query/01g-2000")),
            page(&["C"], None),
        ]);
        let client = client_for(&url, Duration::from_secs(1));

        let records = client
            .query(&QueryRequest::tooling("ApexClass", &["Name"]))
            .await
            .expect("query");
        assert_eq!(names(&records), vec!["A", "B", "C"]);
        assert!(records.iter().all(|r| !r.contains_key("attributes")));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].starts_with("GET /services/data/v58.0/tooling/query?q="));
        assert!(seen[1].starts_with("GET /services/data/v58.0/tooling/query/01g-2000"));
    }

    #[tokio::test]
    async fn query_stops_at_the_fetch_bound() {
        let (url, seen) = serve(vec![
            page(&["A", "B"], Some("/services/data/v58.0/query/01g-2000")),
            page(&["C", "D"], Some("/services/data/v58.0/query/01g-4000")),
            page(&["E"], None),
        ]);
        let client = client_for(&url, Duration::from_secs(1));
        let mut request = QueryRequest::data("Account", &["Name"]);
        request.max_fetch = 3;

        let records = client.query(&request).await.expect("query");
        assert_eq!(names(&records), vec!["A", "B", "C"]);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn last_page_at_the_fetch_bound_is_complete() {
        let (url, seen) = serve(vec![page(&["A", "B"], None)]);
        let client = client_for(&url, Duration::from_secs(1));
        let mut request = QueryRequest::data("Account", &["Name"]);
        request.max_fetch = 2;

        let records = client.query(&request).await.expect("query");
        assert_eq!(names(&records), vec!["A", "B"]);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[rstest]
    #[case(2, 2, false, false)]
    #[case(2, 2, true, true)]
    #[case(3, 2, false, true)]
    #[case(1, 2, true, false)]
    fn truncation(
        #[case] fetched: usize,
        #[case] max_fetch: usize,
        #[case] more: bool,
        #[case] expected: bool,
    ) {
        assert_eq!(is_truncated(fetched, max_fetch, more), expected);
    }

    #[tokio::test]
    async fn retrieve_polls_until_done() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"PK\x03\x04zip");
        let (url, seen) = serve(vec![
            retrieve_result("<done>false</done><id>09S000</id><state>Queued</state>"),
            retrieve_result("<done>false</done><status>InProgress</status>"),
            retrieve_result(&format!(
                "<done>true</done><status>Succeeded</status><success>true</success><zipFile>{encoded}</zipFile>"
            )),
        ]);
        let client = client_for(&url, Duration::from_secs(5));

        let archive = client
            .retrieve("CustomObject", &["A__c".to_string()])
            .await
            .expect("retrieve");
        assert_eq!(archive, b"PK\x03\x04zip".to_vec());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|line| line.starts_with("POST /services/Soap/m/58.0")));
    }

    #[tokio::test]
    async fn retrieve_gives_up_after_poll_timeout() {
        let (url, _seen) = serve(vec![
            retrieve_result("<done>false</done><id>09S000</id><state>Queued</state>"),
            retrieve_result("<done>false</done><status>InProgress</status>"),
        ]);
        let client = client_for(&url, Duration::ZERO);

        let err = client
            .retrieve_archive("CustomObject".into(), vec!["A__c".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Timeout(limit) if limit == Duration::ZERO));
    }

    #[tokio::test]
    async fn unreachable_instance_is_a_request_error() {
        let client = SalesforceClient::new(ClientSettings {
            instance_url: "http://127.0.0.1:9".into(),
            access_token: "token".into(),
            api_version: "58.0".into(),
            request_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(10),
            poll_timeout: Duration::from_millis(10),
        });
        let err = client
            .query(&QueryRequest::data("Organization", &["NamespacePrefix"]))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Request { .. }));
    }
}
