//! Pinecone vector index over HTTP.
//!
//! Index management goes to the control plane (`api.pinecone.io`); upserts go
//! to the data-plane host reported for each index.

use crate::types::VectorRecord;
use crate::vector_index::{IndexManager, IndexWriter};
use docvec_core::config::{IndexSettings, Metric};
use docvec_core::{AppError, AppResult};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_CONTROLLER_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";
const REQUEST_TIMEOUT_SECS: u64 = 60;

pub struct PineconeIndex {
    client: Client,
    controller_url: String,
    api_key: String,
    cloud: String,
    region: String,
    /// Data-plane hosts by index name, filled on first use.
    hosts: Mutex<HashMap<String, String>>,
}

impl std::fmt::Debug for PineconeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeIndex")
            .field("controller_url", &self.controller_url)
            .field("cloud", &self.cloud)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    name: String,
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    status: Option<IndexStatus>,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: IndexSpec<'a>,
}

#[derive(Debug, Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    #[serde(skip_serializing_if = "no_metadata")]
    metadata: &'a Map<String, Value>,
}

fn no_metadata(metadata: &&Map<String, Value>) -> bool {
    metadata.is_empty()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: Option<usize>,
}

impl<'a> UpsertRequest<'a> {
    fn new(records: &'a [VectorRecord]) -> Self {
        Self {
            vectors: records
                .iter()
                .map(|r| UpsertVector {
                    id: &r.id,
                    values: &r.values,
                    metadata: &r.metadata,
                })
                .collect(),
        }
    }
}

impl PineconeIndex {
    pub fn new(settings: &IndexSettings, api_key: &str) -> AppResult<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::Config("Pinecone API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                AppError::Index(format!("Failed to create HTTP client for Pinecone: {}", e))
            })?;

        let controller_url = settings
            .controller_url
            .as_deref()
            .unwrap_or(DEFAULT_CONTROLLER_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            controller_url,
            api_key: api_key.trim().to_string(),
            cloud: settings.cloud.clone(),
            region: settings.region.clone(),
            hosts: Mutex::new(HashMap::new()),
        })
    }

    pub fn controller_url(&self) -> &str {
        &self.controller_url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> AppResult<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| AppError::Index(format!("Failed to {}: {}", action, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Index(format!(
                "Failed to {} ({}): {}",
                action, status, body
            )));
        }

        Ok(response)
    }

    /// GET /indexes/{name}; `None` when the index does not exist.
    async fn describe(&self, name: &str) -> AppResult<Option<IndexDescription>> {
        let url = format!("{}/indexes/{}", self.controller_url, name);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| AppError::Index(format!("Failed to describe index '{}': {}", name, e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Index(format!(
                "Failed to describe index '{}' ({}): {}",
                name, status, body
            )));
        }

        let description = response.json::<IndexDescription>().await.map_err(|e| {
            AppError::Index(format!("Failed to parse Pinecone index description: {}", e))
        })?;

        Ok(Some(description))
    }

    fn cached_host(&self, name: &str) -> AppResult<Option<String>> {
        let hosts = self
            .hosts
            .lock()
            .map_err(|_| AppError::Index("Pinecone host cache lock poisoned".to_string()))?;
        Ok(hosts.get(name).cloned())
    }

    fn remember_host(&self, name: &str, host: &str) -> AppResult<()> {
        let mut hosts = self
            .hosts
            .lock()
            .map_err(|_| AppError::Index("Pinecone host cache lock poisoned".to_string()))?;
        hosts.insert(name.to_string(), host.to_string());
        Ok(())
    }

    /// Data-plane base URL of an index.
    async fn data_plane_url(&self, name: &str) -> AppResult<String> {
        let host = match self.cached_host(name)? {
            Some(host) => host,
            None => {
                let host = self
                    .describe(name)
                    .await?
                    .and_then(|d| d.host)
                    .ok_or_else(|| {
                        AppError::Index(format!("Index '{}' has no data-plane host", name))
                    })?;
                self.remember_host(name, &host)?;
                host
            }
        };

        Ok(data_plane_base(&host))
    }
}

/// Hosts are reported without a scheme.
fn data_plane_base(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[async_trait::async_trait]
impl IndexManager for PineconeIndex {
    #[instrument(skip(self))]
    async fn index_exists(&self, name: &str) -> AppResult<bool> {
        let url = format!("{}/indexes", self.controller_url);
        let list: IndexList = self
            .send(self.client.get(&url), "list indexes")
            .await?
            .json()
            .await
            .map_err(|e| AppError::Index(format!("Failed to parse Pinecone index list: {}", e)))?;

        Ok(list.indexes.iter().any(|index| index.name == name))
    }

    #[instrument(skip(self))]
    async fn index_dimension(&self, name: &str) -> AppResult<Option<usize>> {
        Ok(self.describe(name).await?.and_then(|d| d.dimension))
    }

    #[instrument(skip(self))]
    async fn create_index(&self, name: &str, dimension: usize, metric: Metric) -> AppResult<()> {
        let url = format!("{}/indexes", self.controller_url);
        let request = CreateIndexRequest {
            name,
            dimension,
            metric: metric.as_str(),
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &self.cloud,
                    region: &self.region,
                },
            },
        };

        self.send(self.client.post(&url).json(&request), "create index")
            .await?;

        debug!("Requested Pinecone index '{}'", name);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn is_ready(&self, name: &str) -> AppResult<bool> {
        let Some(description) = self.describe(name).await? else {
            return Ok(false);
        };

        let ready = description.status.is_some_and(|s| s.ready);
        if ready {
            if let Some(host) = &description.host {
                self.remember_host(name, host)?;
            }
        }
        Ok(ready)
    }
}

#[async_trait::async_trait]
impl IndexWriter for PineconeIndex {
    #[instrument(skip(self, records), fields(records = records.len()))]
    async fn upsert(&self, index_name: &str, records: Vec<VectorRecord>) -> AppResult<()> {
        let url = format!("{}/vectors/upsert", self.data_plane_url(index_name).await?);
        let request = UpsertRequest::new(&records);

        let response: UpsertResponse = self
            .send(self.client.post(&url).json(&request), "upsert vectors")
            .await?
            .json()
            .await
            .map_err(|e| AppError::Index(format!("Failed to parse upsert response: {}", e)))?;

        if let Some(count) = response.upserted_count {
            if count != records.len() {
                return Err(AppError::Index(format!(
                    "Pinecone upserted {} of {} vectors",
                    count,
                    records.len()
                )));
            }
        }

        debug!("Upserted {} vectors into '{}'", records.len(), index_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> IndexSettings {
        IndexSettings::default()
    }

    #[test]
    fn test_new_requires_key() {
        assert!(matches!(
            PineconeIndex::new(&settings(), "  "),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_controller_url_override() {
        let mut s = settings();
        s.controller_url = Some("http://localhost:5080/".to_string());
        let index = PineconeIndex::new(&s, "key").unwrap();
        assert_eq!(index.controller_url(), "http://localhost:5080");

        let index = PineconeIndex::new(&settings(), "key").unwrap();
        assert_eq!(index.controller_url(), DEFAULT_CONTROLLER_URL);
    }

    #[test]
    fn test_create_request_shape() {
        let request = CreateIndexRequest {
            name: "docs",
            dimension: 1536,
            metric: Metric::Cosine.as_str(),
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: "aws",
                    region: "us-east-1",
                },
            },
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "name": "docs",
                "dimension": 1536,
                "metric": "cosine",
                "spec": {"serverless": {"cloud": "aws", "region": "us-east-1"}}
            })
        );
    }

    #[test]
    fn test_upsert_request_shape() {
        let mut metadata = Map::new();
        metadata.insert("text".to_string(), json!("hello"));
        let records = vec![
            VectorRecord {
                id: "doc_0".to_string(),
                values: vec![0.5, 0.25],
                metadata,
            },
            VectorRecord {
                id: "doc_1".to_string(),
                values: vec![1.0, 0.0],
                metadata: Map::new(),
            },
        ];

        let value = serde_json::to_value(UpsertRequest::new(&records)).unwrap();
        assert_eq!(
            value,
            json!({"vectors": [
                {"id": "doc_0", "values": [0.5, 0.25], "metadata": {"text": "hello"}},
                {"id": "doc_1", "values": [1.0, 0.0]}
            ]})
        );
    }

    #[test]
    fn test_parse_descriptions() {
        let list: IndexList = serde_json::from_value(json!({
            "indexes": [
                {"name": "docs", "dimension": 1536, "metric": "cosine",
                 "host": "docs-abc123.svc.pinecone.io",
                 "status": {"ready": true, "state": "Ready"}}
            ]
        }))
        .unwrap();
        assert_eq!(list.indexes.len(), 1);
        assert_eq!(list.indexes[0].dimension, Some(1536));
        assert!(list.indexes[0].status.as_ref().unwrap().ready);

        let pending: IndexDescription = serde_json::from_value(json!({
            "name": "docs",
            "status": {"ready": false, "state": "Initializing"}
        }))
        .unwrap();
        assert!(pending.host.is_none());
        assert!(pending.dimension.is_none());
        assert!(!pending.status.unwrap().ready);

        let empty: IndexList = serde_json::from_value(json!({})).unwrap();
        assert!(empty.indexes.is_empty());
    }

    #[test]
    fn test_data_plane_base() {
        assert_eq!(
            data_plane_base("docs-abc123.svc.pinecone.io"),
            "https://docs-abc123.svc.pinecone.io"
        );
        assert_eq!(data_plane_base("http://localhost:5081/"), "http://localhost:5081");
    }

    #[test]
    fn test_host_cache() {
        let index = PineconeIndex::new(&settings(), "key").unwrap();
        assert_eq!(index.cached_host("docs").unwrap(), None);
        index.remember_host("docs", "docs-abc.svc.pinecone.io").unwrap();
        assert_eq!(
            index.cached_host("docs").unwrap().as_deref(),
            Some("docs-abc.svc.pinecone.io")
        );
    }
}
