//! HTTP collaborator: the proxy-management service endpoints the console reads
//! and writes through.

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use shared::{
    domain::NodeId,
    error::ApiError,
    protocol::{
        LogPage, LogQuery, ModelListResponse, ModelTag, NodeDraft, NodeListResponse, NodeRecord,
        NodeSummary, PullRequest, PullResponse, PullResult,
    },
};
use tracing::debug;

use crate::{error::ClientError, settings::ConsoleSettings};

pub const CSRF_HEADER: &str = "X-CSRFToken";

#[async_trait]
pub trait ConsoleApi: Send + Sync {
    async fn query_logs(&self, query: &LogQuery) -> Result<LogPage, ClientError>;
    /// All registered nodes, or only `node_id` when given.
    async fn list_nodes(&self, node_id: Option<NodeId>) -> Result<Vec<NodeSummary>, ClientError>;
    /// Returns the per-node results; order is whatever the service produced.
    async fn pull_model(&self, request: &PullRequest) -> Result<Vec<PullResult>, ClientError>;
    async fn list_models(&self) -> Result<Vec<ModelTag>, ClientError>;
    /// Creates a node when `node_id` is `None`, otherwise replaces it.
    async fn save_node(
        &self,
        node_id: Option<NodeId>,
        draft: &NodeDraft,
    ) -> Result<NodeRecord, ClientError>;
}

pub struct HttpConsoleApi {
    http: Client,
    base_url: String,
    csrf_token: Option<String>,
    session_cookie: Option<String>,
}

impl HttpConsoleApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            csrf_token: None,
            session_cookie: None,
        }
    }

    pub fn from_settings(settings: &ConsoleSettings) -> Self {
        let mut api = Self::new(settings.base_url.clone());
        api.csrf_token = settings.csrf_token.clone();
        api.session_cookie = settings.session_cookie.clone();
        api
    }

    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let unsafe_method = method != Method::GET;
        let mut builder = self
            .http
            .request(method, format!("{}{path}", self.base_url));
        if let Some(cookie) = &self.session_cookie {
            builder = builder.header(header::COOKIE, cookie.as_str());
        }
        if unsafe_method {
            if let Some(token) = &self.csrf_token {
                builder = builder.header(CSRF_HEADER, token.as_str());
            }
        }
        builder
    }
}

/// Non-success status becomes [`ClientError::Status`] carrying the body text.
async fn require_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}

async fn decode_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(ClientError::from)
}

#[async_trait]
impl ConsoleApi for HttpConsoleApi {
    async fn query_logs(&self, query: &LogQuery) -> Result<LogPage, ClientError> {
        debug!(offset = query.offset, limit = query.limit, source = query.source.as_str(), "querying logs");
        let response = self
            .request(Method::GET, "/api/logs/")
            .query(query)
            .send()
            .await?;
        decode_json(require_success(response).await?).await
    }

    async fn list_nodes(&self, node_id: Option<NodeId>) -> Result<Vec<NodeSummary>, ClientError> {
        let mut builder = self.request(Method::GET, "/api/proxy/active-requests");
        if let Some(node_id) = node_id {
            builder = builder.query(&[("node_id", node_id.0)]);
        }
        let response = require_success(builder.send().await?).await?;
        let body: NodeListResponse = decode_json(response).await?;
        Ok(body.nodes)
    }

    async fn pull_model(&self, request: &PullRequest) -> Result<Vec<PullResult>, ClientError> {
        debug!(model = %request.model, node_id = ?request.node_id, "submitting model pull");
        let response = self
            .request(Method::POST, "/api/proxy/pull")
            .json(request)
            .send()
            .await?;
        let status = response.status();
        // Failure statuses still carry a JSON `{error}` body worth showing.
        let body: PullResponse = decode_json(response).await?;
        match body.results {
            Some(results) if status.is_success() => Ok(results),
            _ => Err(ClientError::Rejected {
                status: status.as_u16(),
                message: body.error,
            }),
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelTag>, ClientError> {
        let response = self.request(Method::GET, "/api/proxy/tags").send().await?;
        let body: ModelListResponse = decode_json(require_success(response).await?).await?;
        Ok(body.models)
    }

    async fn save_node(
        &self,
        node_id: Option<NodeId>,
        draft: &NodeDraft,
    ) -> Result<NodeRecord, ClientError> {
        let builder = match node_id {
            Some(node_id) => self.request(Method::PUT, &format!("/api/proxy/nodes/{node_id}/")),
            None => self.request(Method::POST, "/api/proxy/nodes/"),
        };
        let response = builder.json(draft).send().await?;
        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            let message = ApiError::from_body(&body)
                .and_then(|err| err.message().map(str::to_string))
                .or_else(|| Some("Invalid node data".to_string()));
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        decode_json(require_success(response).await?).await
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
