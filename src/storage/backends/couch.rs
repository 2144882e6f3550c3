//! CouchDB storage backend
//!
//! Indexes live in the `_design/employment` document and aggregates in
//! `_design/queries`, each as a view whose map function is generated from the
//! collection schema.
//!
//! Documents are written under ids that sort in insertion order, so view rows
//! sharing a key and `_all_docs` come back in the order records were loaded.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;
use url::Url;

use crate::storage::{
    config::CouchConfig,
    error::{StorageError, StorageResult},
    schema::CollectionSchema,
    traits::DocumentStore,
    types::*,
};

/// Design document holding secondary indexes
pub const INDEX_DESIGN: &str = "employment";
/// Design document holding aggregates
pub const AGGREGATE_DESIGN: &str = "queries";

/// CouchDB backend speaking the HTTP API
pub struct CouchBackend {
    client: Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
    /// Last id sequence handed out, in microseconds since the epoch
    sequence: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    id: String,
    rev: String,
}

#[derive(Debug, Deserialize)]
struct ViewResponse {
    rows: Vec<ViewRow>,
}

#[derive(Debug, Deserialize)]
struct ViewRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    doc: Option<Value>,
}

impl CouchBackend {
    /// Create a new CouchDB client
    pub fn new(config: &CouchConfig) -> StorageResult<Self> {
        let base_url = Url::parse(&config.url).map_err(|e| {
            StorageError::configuration(format!("Invalid CouchDB URL {}: {}", config.url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(StorageError::configuration(format!(
                "CouchDB URL cannot be a base: {}",
                config.url
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
            sequence: AtomicU64::new(0),
        })
    }

    /// Next insertion-ordered document id
    ///
    /// Follows the wall clock but never repeats or goes backwards within
    /// this process.
    fn next_document_id(&self) -> DocumentId {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or_default();
        let next = |last: u64| now.max(last + 1);
        let previous = match self
            .sequence
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(next(last)))
        {
            Ok(last) | Err(last) => last,
        };
        DocumentId::ordered(next(previous))
    }

    /// URL for a path below the server root, one segment per element
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot-be-a-base URLs are rejected in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        url
    }

    fn design_url(&self, collection: &str, design: &str) -> Url {
        self.url(&[collection, "_design", design])
    }

    fn view_url(&self, collection: &str, design: &str, view: &str) -> Url {
        let mut url = self.design_url(collection, design);
        if let Ok(mut path) = url.path_segments_mut() {
            path.push("_view");
            path.push(view);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_ref()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, context: &str) -> StorageResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| StorageError::transport(format!("{}: {}", context, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status, context, &body))
    }

    async fn put_design(
        &self,
        collection: &str,
        design: &str,
        views: Map<String, Value>,
    ) -> StorageResult<()> {
        let url = self.design_url(collection, design);
        let body = json!({ "language": "javascript", "views": views });
        self.send(
            self.request(Method::PUT, url).json(&body),
            &format!("install _design/{} on {}", design, collection),
        )
        .await?;
        Ok(())
    }
}

/// Map a non-success CouchDB status onto the store taxonomy
pub(crate) fn error_for_status(status: StatusCode, context: &str, body: &str) -> StorageError {
    let message = format!("{} ({}): {}", context, status, body.trim());
    match status {
        StatusCode::NOT_FOUND => StorageError::not_found(message),
        StatusCode::CONFLICT => StorageError::conflict(message),
        StatusCode::PRECONDITION_FAILED => StorageError::already_exists(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StorageError::configuration(message),
        s if s.is_server_error() => StorageError::transport(message),
        _ => StorageError::malformed(message),
    }
}

/// Split a CouchDB document into identity, revision and user content
pub(crate) fn split_document(doc: Value) -> StorageResult<StoredDocument> {
    let Value::Object(mut fields) = doc else {
        return Err(StorageError::malformed("document is not a JSON object"));
    };

    let id = match fields.remove("_id") {
        Some(Value::String(id)) => id,
        _ => return Err(StorageError::malformed("document without _id")),
    };
    let rev = match fields.remove("_rev") {
        Some(Value::String(rev)) => rev,
        _ => return Err(StorageError::malformed(format!("document {} without _rev", id))),
    };

    Ok(StoredDocument {
        id: DocumentId(id),
        rev: Revision(rev),
        content: Value::Object(fields),
    })
}

#[async_trait]
impl DocumentStore for CouchBackend {
    async fn exists(&self, collection: &str) -> StorageResult<bool> {
        let url = self.url(&[collection]);
        match self
            .send(self.request(Method::HEAD, url), &format!("check {}", collection))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, schema: &CollectionSchema) -> StorageResult<()> {
        let url = self.url(&[&schema.name]);
        self.send(
            self.request(Method::PUT, url),
            &format!("create {}", schema.name),
        )
        .await?;

        if !schema.indexes.is_empty() {
            let views = schema
                .indexes
                .iter()
                .map(|i| (i.name.clone(), json!({ "map": i.map_function() })))
                .collect();
            self.put_design(&schema.name, INDEX_DESIGN, views).await?;
        }

        if !schema.aggregates.is_empty() {
            let views = schema
                .aggregates
                .iter()
                .map(|a| (a.name.clone(), json!({ "map": a.rule.map_function() })))
                .collect();
            self.put_design(&schema.name, AGGREGATE_DESIGN, views).await?;
        }

        debug!("Created CouchDB database {}", schema.name);
        Ok(())
    }

    async fn insert(&self, collection: &str, content: &Value) -> StorageResult<WriteReceipt> {
        let id = self.next_document_id();
        let url = self.url(&[collection, id.as_str()]);
        let response: WriteResponse = self
            .send(
                self.request(Method::PUT, url).json(content),
                &format!("insert into {}", collection),
            )
            .await?
            .json()
            .await?;

        Ok(WriteReceipt {
            id: DocumentId(response.id),
            rev: Revision(response.rev),
        })
    }

    async fn get_by_index(
        &self,
        collection: &str,
        index: &str,
        key: &str,
    ) -> StorageResult<Vec<StoredDocument>> {
        let mut url = self.view_url(collection, INDEX_DESIGN, index);
        url.query_pairs_mut()
            .append_pair("key", &Value::String(key.to_string()).to_string())
            .append_pair("include_docs", "true");

        let response: ViewResponse = self
            .send(
                self.request(Method::GET, url),
                &format!("lookup {}/{} = {}", collection, index, key),
            )
            .await?
            .json()
            .await?;

        response
            .rows
            .into_iter()
            .map(|row| {
                row.doc
                    .ok_or_else(|| StorageError::malformed("view row without doc"))
                    .and_then(split_document)
            })
            .collect()
    }

    async fn put(
        &self,
        collection: &str,
        id: &DocumentId,
        content: &Value,
        expected: &Revision,
    ) -> StorageResult<Revision> {
        let mut url = self.url(&[collection, id.as_str()]);
        url.query_pairs_mut().append_pair("rev", expected.as_str());

        let response: WriteResponse = self
            .send(
                self.request(Method::PUT, url).json(content),
                &format!("update {}/{} at {}", collection, id, expected),
            )
            .await?
            .json()
            .await?;

        Ok(Revision(response.rev))
    }

    async fn read_aggregate(&self, collection: &str, aggregate: &str) -> StorageResult<Vec<Value>> {
        let url = self.view_url(collection, AGGREGATE_DESIGN, aggregate);
        let response: ViewResponse = self
            .send(
                self.request(Method::GET, url),
                &format!("read {}/{}", collection, aggregate),
            )
            .await?
            .json()
            .await?;

        Ok(response.rows.into_iter().map(|row| row.value).collect())
    }

    async fn all_documents(&self, collection: &str) -> StorageResult<Vec<StoredDocument>> {
        let mut url = self.url(&[collection, "_all_docs"]);
        url.query_pairs_mut().append_pair("include_docs", "true");

        let response: ViewResponse = self
            .send(
                self.request(Method::GET, url),
                &format!("list {}", collection),
            )
            .await?
            .json()
            .await?;

        response
            .rows
            .into_iter()
            .filter(|row| {
                !row.id
                    .as_deref()
                    .is_some_and(|id| id.starts_with("_design/"))
            })
            .map(|row| {
                row.doc
                    .ok_or_else(|| StorageError::malformed("_all_docs row without doc"))
                    .and_then(split_document)
            })
            .collect()
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let start = Instant::now();
        let result = self
            .send(self.request(Method::GET, self.url(&[])), "health check")
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        Ok(HealthStatus {
            healthy: result.is_ok(),
            backend_type: "couch".to_string(),
            latency_ms,
            errors: result.err().map(|e| e.to_string()).into_iter().collect(),
        })
    }
}
