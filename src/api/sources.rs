use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::connection::credentials::Credentials;
use crate::error::{ViewerError, ViewerResult};

/// Body returned by `/sources_list`. Backends answer either with a document
/// list under `data` or with an `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcesResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Vec<SourceNode>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One ingested document. Only the file name is required; the rest varies by backend version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceNode {
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "fileSize", default)]
    pub file_size: Option<i64>,
    #[serde(rename = "fileSource", default)]
    pub file_source: Option<String>,
    #[serde(rename = "nodeCount", default)]
    pub node_count: Option<i64>,
    #[serde(rename = "relationshipCount", default)]
    pub relationship_count: Option<i64>,
}

impl SourcesResponse {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
            && self.status.as_deref().map(|s| s.eq_ignore_ascii_case("success")).unwrap_or(true)
    }

    /// Parse a raw body, accepting a bare array of documents as well.
    pub fn from_value(v: Value) -> ViewerResult<Self> {
        if v.is_array() {
            let data: Vec<SourceNode> = serde_json::from_value(v)?;
            return Ok(SourcesResponse { data, ..Default::default() });
        }
        Ok(serde_json::from_value(v)?)
    }
}

/// Build `/sources_list` with credentials as query parameters. The password is
/// base64 encoded, which is encoding only; protect the transport with https.
pub fn sources_list_url(base: &str, credentials: &Credentials) -> ViewerResult<Url> {
    let base = format!("{}/", base.trim_end_matches('/'));
    let mut url = Url::parse(&base)?.join("sources_list")?;
    url.query_pairs_mut()
        .append_pair("uri", &credentials.uri)
        .append_pair("database", &credentials.database)
        .append_pair("userName", &credentials.username)
        .append_pair("password", &BASE64_STANDARD.encode(credentials.password.as_bytes()));
    Ok(url)
}

/// HTTP client for the ingestion backend.
#[derive(Clone)]
pub struct SourceLister {
    base_url: String,
    http_client: Client,
}

impl SourceLister {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: Client::new(),
        }
    }

    /// Single GET, no retry or pagination.
    pub async fn list_sources(&self, credentials: &Credentials) -> ViewerResult<SourcesResponse> {
        let url = sources_list_url(&self.base_url, credentials)?;
        log::debug!("GET {}/sources_list", self.base_url);
        let response = self.http_client.get(url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(ViewerError::BadStatus(response.status().as_u16()));
        }
        let body: Value = response.json().await?;
        SourcesResponse::from_value(body)
    }
}
