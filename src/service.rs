//! The SearchService seam.
//!
//! [`SearchService`] is the one collaborator the client talks to. The
//! production implementation, [`HttpSearchService`], speaks the JSON and
//! multipart HTTP contract:
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | `POST` | `/search` | Ranked document ids and scores |
//! | `GET`  | `/documents/{id}` | One document |
//! | `GET`  | `/documents` | Every document |
//! | `GET`  | `/datasets` | Dataset catalog |
//! | `POST` | `/upload` | Create a dataset from a file or pasted text |
//! | `GET`  | `/` | Service banner and version |
//!
//! Any non-2xx status is a [`ClientError::Status`]. Nothing is retried.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::models::{
    Dataset, Document, DocumentId, SearchRequest, SearchResponse, ServiceStatus, UploadResult,
};

/// A dataset upload ready to send: the name plus exactly one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub dataset_name: String,
    pub payload: UploadPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadPayload {
    /// Sent as the multipart `file` field.
    File { file_name: String, bytes: Vec<u8> },
    /// Sent as the multipart `text_data` field.
    Text(String),
}

/// Operations offered by the backend search service.
///
/// Implementations must be shareable across tasks: the client fans document
/// fetches out onto the runtime and holds the service behind an `Arc`.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;

    async fn get_document(&self, id: DocumentId) -> Result<Document>;

    async fn list_documents(&self) -> Result<Vec<Document>>;

    async fn list_datasets(&self) -> Result<Vec<Dataset>>;

    async fn upload(&self, request: UploadRequest) -> Result<UploadResult>;

    async fn status(&self) -> Result<ServiceStatus>;
}

/// [`SearchService`] over HTTP with `reqwest`.
#[derive(Clone)]
pub struct HttpSearchService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchService {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| ClientError::Http {
            url: config.service.base_url.clone(),
            source,
        })?;

        Ok(Self {
            client,
            base_url: config.service.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode a JSON body, mapping every failure mode
    /// onto [`ClientError`].
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: String,
    ) -> Result<T> {
        tracing::debug!(%url, "sending request");

        let resp = request.send().await.map_err(|source| ClientError::Http {
            url: url.clone(),
            source,
        })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|source| ClientError::Http {
            url: url.clone(),
            source,
        })?;

        if !status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "non-success response");
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl SearchService for HttpSearchService {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let url = self.url("/search");
        self.send_json(self.client.post(&url).json(request), url).await
    }

    async fn get_document(&self, id: DocumentId) -> Result<Document> {
        let url = self.url(&format!("/documents/{}", id));
        self.send_json(self.client.get(&url), url).await
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let url = self.url("/documents");
        self.send_json(self.client.get(&url), url).await
    }

    async fn list_datasets(&self) -> Result<Vec<Dataset>> {
        let url = self.url("/datasets");
        self.send_json(self.client.get(&url), url).await
    }

    async fn upload(&self, request: UploadRequest) -> Result<UploadResult> {
        let url = self.url("/upload");

        let form = Form::new().text("dataset_name", request.dataset_name);
        let form = match request.payload {
            UploadPayload::File { file_name, bytes } => {
                form.part("file", Part::bytes(bytes).file_name(file_name))
            }
            UploadPayload::Text(text) => form.text("text_data", text),
        };

        self.send_json(self.client.post(&url).multipart(form), url).await
    }

    async fn status(&self) -> Result<ServiceStatus> {
        let url = self.url("/");
        self.send_json(self.client.get(&url), url).await
    }
}
