use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chat_core::config::TOP_K_RANGE;
use chat_core::Config;
use futures::stream;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use tokio_util::sync::CancellationToken;

use crate::error::{QueryError, Result};
use crate::models::{DocumentUploadResponse, ErrorBody, HealthResponse, QueryRequest, QueryResponse};
use crate::provider::{QueryProvider, QueryStream};
use crate::stream::query_stream_from_sse;

/// HTTP client for the document chat server.
pub struct DocumentChatClient {
    client: Client,
    base_url: String,
    top_k: Option<u8>,
    request_timeout: Duration,
    idle_timeout: Duration,
    streaming: bool,
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let mut message = ErrorBody::message_from(&body);
    if message.is_empty() {
        message = status.canonical_reason().unwrap_or("request failed").to_string();
    }
    log::warn!("[client] HTTP {}: {}", status, message);
    Err(QueryError::Api { status, message })
}

impl DocumentChatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let defaults = Config::default();
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            top_k: defaults.top_k,
            request_timeout: defaults.request_timeout(),
            idle_timeout: defaults.idle_timeout(),
            streaming: defaults.streaming,
        }
    }

    /// Build a client from configuration; the connect timeout is applied to
    /// the underlying connection pool. An out-of-range `top_k` is rejected.
    pub fn from_config(config: &Config) -> Result<Self> {
        if let Some(k) = config.top_k.filter(|k| !TOP_K_RANGE.contains(k)) {
            return Err(QueryError::InvalidTopK(k));
        }
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            top_k: config.top_k,
            request_timeout: config.request_timeout(),
            idle_timeout: config.idle_timeout(),
            streaming: config.streaming,
        })
    }

    pub fn with_top_k(mut self, top_k: Option<u8>) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    /// Send `request`, bounded by the request timeout and by `cancel`.
    async fn send(&self, request: RequestBuilder, cancel: &CancellationToken) -> Result<Response> {
        let pending = tokio::time::timeout(self.request_timeout, request.send());
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(QueryError::Cancelled),
            result = pending => result.map_err(|_| {
                QueryError::Timeout(format!(
                    "after {}s waiting for the server to respond",
                    self.request_timeout.as_secs()
                ))
            })??,
        };
        ensure_success(response).await
    }

    /// Probe the server and its current document session.
    pub async fn health(&self) -> Result<HealthResponse> {
        let request = self.client.get(self.url("/health"));
        let response = self.send(request, &CancellationToken::new()).await?;
        Ok(response.json().await?)
    }

    /// Upload a document; the server replaces any previously loaded one.
    ///
    /// Processing happens before the server answers, so this request is not
    /// bounded by the request timeout.
    pub async fn upload_document(&self, path: &Path) -> Result<DocumentUploadResponse> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("not a file path: {}", path.display()),
                )
            })?;

        let bytes = tokio::fs::read(path).await?;
        log::info!("[client] uploading {} ({} bytes)", file_name, bytes.len());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(path))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/api/v1/documents"))
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let uploaded: DocumentUploadResponse = response.json().await?;

        log::info!(
            "[client] {} processed into {} chunks",
            uploaded.filename,
            uploaded.total_chunks
        );
        Ok(uploaded)
    }

    /// Ask a question through the buffered endpoint.
    pub async fn query_sync(&self, question: &str, cancel: &CancellationToken) -> Result<QueryResponse> {
        let request = QueryRequest::new(question, self.top_k)?;
        self.query_sync_request(&request, cancel).await
    }

    async fn query_sync_request(
        &self,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<QueryResponse> {
        let builder = self.client.post(self.url("/api/v1/query/sync")).json(request);
        let response = self.send(builder, cancel).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl QueryProvider for DocumentChatClient {
    async fn query_stream(&self, question: &str, cancel: &CancellationToken) -> Result<QueryStream> {
        let request = QueryRequest::new(question, self.top_k)?;

        if !self.streaming {
            log::debug!("[client] streaming disabled, using buffered endpoint");
            let response = self.query_sync_request(&request, cancel).await?;
            return Ok(Box::pin(stream::iter(
                response
                    .into_chunks()
                    .into_iter()
                    .map(Ok::<_, QueryError>),
            )));
        }

        log::debug!(
            "[client] POST /api/v1/query ({} chars, top_k={:?})",
            request.query.len(),
            request.top_k
        );

        let builder = self
            .client
            .post(self.url("/api/v1/query"))
            .header(ACCEPT, "text/event-stream")
            .json(&request);
        let response = self.send(builder, cancel).await?;

        Ok(query_stream_from_sse(
            response.bytes_stream(),
            cancel.clone(),
            self.idle_timeout,
        ))
    }
}
