//! HTTP plumbing and the reqwest-backed collaborators.
//!
//! [`HttpExecutor`] turns an [`HttpRequest`] into an [`HttpResponse`]. On top
//! of it sit the three network collaborators the engine needs:
//!
//! - [`HttpChatClient`]: `POST {base}/{app_id}/chat[?model=]`
//! - [`HttpComponentValidator`]: `POST {endpoint}` with `{componentCode}`
//! - [`HttpApiCaller`]: runs `API_CALL` effects on the tokio runtime and posts
//!   the decoded body back to a render session's inbox
//!
//! # Example
//!
//! ```rust,ignore
//! use crayon_core::http::{HttpRequest, HttpExecutor};
//!
//! let executor = HttpExecutor::new();
//! let request = HttpRequest::get("https://api.example.com/data")
//!     .header("Authorization", "Bearer token");
//!
//! let response = executor.execute(request).await?;
//! println!("Status: {}", response.status);
//! ```

use crate::chat::{ChatClient, ChatError, ChatRequest, ChatResponse};
use crate::effects::{ApiCaller, ApiRequest};
use crate::session::{InboxSender, SessionMessage};
use crate::validation::{ComponentValidator, ValidationError, ValidationResult};
use crate::value::{self, DynamicValue};
use async_trait::async_trait;
use crayon_config::{ChatConfig, ValidationConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Requests and responses
// ============================================================================

/// HTTP request configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Target URL
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Query parameters appended to the URL
    pub query: Vec<(String, String)>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body (for POST, PUT, PATCH)
    pub body: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl HttpRequest {
    /// Create a request with any method.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            query: Vec::new(),
            headers: HashMap::new(),
            body: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Create a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Add a query parameter (builder pattern).
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header (builder pattern).
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the request body (builder pattern).
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a JSON body and content type (builder pattern).
    pub fn json_body(self, body: impl Into<String>) -> Self {
        self.header("Content-Type", "application/json").body(body)
    }

    /// Set the timeout (builder pattern).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Get the method as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Parse a method name, ignoring case.
    pub fn parse(raw: &str) -> Option<Self> {
        [
            Self::Get,
            Self::Post,
            Self::Put,
            Self::Patch,
            Self::Delete,
            Self::Head,
            Self::Options,
        ]
        .into_iter()
        .find(|method| method.as_str().eq_ignore_ascii_case(raw.trim()))
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Response body
    pub body: String,
}

impl HttpResponse {
    /// Check if the response status indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// HTTP error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HttpError {
    /// Request failed to send
    #[error("HTTP request failed: {0}")]
    Request(String),
    /// Failed to read response body
    #[error("Failed to read body: {0}")]
    Body(String),
    /// Request timed out
    #[error("Request timed out")]
    Timeout,
    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

// ============================================================================
// Executor
// ============================================================================

/// HTTP executor using reqwest.
#[derive(Clone, Debug)]
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl Default for HttpExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpExecutor {
    /// Create a new HTTP executor.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Execute an HTTP request.
    pub async fn execute(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        debug!("{} {}", req.method, req.url);

        let mut builder = self
            .client
            .request(req.method.to_reqwest(), &req.url)
            .timeout(req.timeout);

        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }

        for (key, value) in &req.headers {
            builder = builder.header(key, value);
        }

        if let Some(body) = req.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout
            } else if e.is_builder() {
                HttpError::InvalidUrl(req.url.clone())
            } else {
                HttpError::Request(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();

        let body = response
            .text()
            .await
            .map_err(|e| HttpError::Body(e.to_string()))?;

        debug!("{} {} -> {}", req.method, req.url, status);
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

// ============================================================================
// Chat client
// ============================================================================

/// Chat backend over HTTP
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    executor: HttpExecutor,
    base_url: String,
    default_model: Option<String>,
    timeout: Duration,
}

impl HttpChatClient {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            executor: HttpExecutor::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs()),
        }
    }

    /// Chat URL for an app, without query parameters
    pub fn chat_url(&self, app_id: &str) -> String {
        format!("{}/{}/chat", self.base_url, app_id)
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let body =
            serde_json::to_string(request).map_err(|e| ChatError::Decode(e.to_string()))?;
        let mut http = HttpRequest::post(self.chat_url(&request.app_id))
            .json_body(body)
            .timeout(self.timeout);
        if let Some(model) = request.model.as_ref().or(self.default_model.as_ref()) {
            http = http.query("model", model.as_str());
        }

        let response = self
            .executor
            .execute(http)
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        if !response.is_success() {
            error!("Chat service answered {}", response.status);
            return Err(ChatError::Status {
                status: response.status,
                body: response.body,
            });
        }
        response
            .json::<ChatResponse>()
            .map_err(|e| ChatError::Decode(e.to_string()))
    }
}

// ============================================================================
// Component validator
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationRequestBody<'a> {
    component_code: &'a str,
}

/// `any` section of a validator reply. Type-check replies carry `isValid`,
/// serialization replies carry `json` and/or `stateManager`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorPayload {
    #[serde(default)]
    pub is_valid: Option<bool>,
    #[serde(default)]
    pub json: Option<serde_json::Value>,
    #[serde(default)]
    pub state_manager: Option<serde_json::Value>,
}

/// Full validator reply
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ValidatorReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub any: ValidatorPayload,
}

impl ValidatorPayload {
    /// Map the reply onto the two-phase result
    pub fn interpret(&self) -> Result<ValidationResult, ValidationError> {
        if let Some(is_valid) = self.is_valid {
            return Ok(ValidationResult {
                typecheck: is_valid,
                serialize: false,
            });
        }
        if self.json.is_some() || self.state_manager.is_some() {
            return Ok(ValidationResult {
                typecheck: false,
                serialize: self.json.is_some(),
            });
        }
        Err(ValidationError::UnexpectedPayload)
    }
}

/// Validation service over HTTP
#[derive(Debug, Clone)]
pub struct HttpComponentValidator {
    executor: HttpExecutor,
    endpoint: String,
    timeout: Duration,
}

impl HttpComponentValidator {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            executor: HttpExecutor::new(),
            endpoint: config.endpoint.clone(),
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl ComponentValidator for HttpComponentValidator {
    async fn validate(&self, component_code: &str) -> Result<ValidationResult, ValidationError> {
        let body = serde_json::to_string(&ValidationRequestBody { component_code })
            .map_err(|e| ValidationError::Transport(e.to_string()))?;
        let request = HttpRequest::post(&self.endpoint)
            .json_body(body)
            .timeout(self.timeout);

        let response = self
            .executor
            .execute(request)
            .await
            .map_err(|e| ValidationError::Transport(e.to_string()))?;
        if !response.is_success() {
            return Err(ValidationError::Status(response.status));
        }

        let reply: ValidatorReply = response
            .json()
            .map_err(|e| ValidationError::Decode(e.to_string()))?;
        if !reply.success {
            debug!("Validator reply has success=false");
        }
        reply.any.interpret()
    }
}

// ============================================================================
// API caller
// ============================================================================

/// Runs `API_CALL` effects in the background and reports to a session inbox
#[derive(Debug, Clone)]
pub struct HttpApiCaller {
    executor: HttpExecutor,
    inbox: InboxSender,
    runtime: tokio::runtime::Handle,
    timeout: Duration,
}

impl HttpApiCaller {
    pub fn new(runtime: tokio::runtime::Handle, inbox: InboxSender) -> Self {
        Self {
            executor: HttpExecutor::new(),
            inbox,
            runtime,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-request timeout (builder pattern).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn perform(
        executor: HttpExecutor,
        request: &ApiRequest,
        timeout: Duration,
    ) -> Result<DynamicValue, String> {
        let mut http = HttpRequest::new(request.method, &request.url).timeout(timeout);
        if let Some(body) = &request.body {
            let bytes = value::encode(body).map_err(|e| e.to_string())?;
            http = http.json_body(String::from_utf8_lossy(&bytes).into_owned());
        }

        let response = executor.execute(http).await.map_err(|e| e.to_string())?;
        if !response.is_success() {
            return Err(format!("status {}", response.status));
        }
        if response.body.trim().is_empty() {
            return Ok(DynamicValue::Null);
        }
        match value::decode(response.body.as_bytes()) {
            Ok(decoded) => Ok(decoded),
            Err(_) => {
                debug!("Response from {} is not JSON; keeping it as text", request.url);
                Ok(DynamicValue::String(response.body))
            }
        }
    }
}

impl ApiCaller for HttpApiCaller {
    fn call(&self, request: ApiRequest) {
        let executor = self.executor.clone();
        let inbox = self.inbox.clone();
        let timeout = self.timeout;
        info!("Starting {} {}", request.method, request.url);

        self.runtime.spawn(async move {
            let result = Self::perform(executor, &request, timeout).await;
            if let Err(e) = &result {
                warn!("{} {} failed: {}", request.method, request.url, e);
            }
            let message = SessionMessage::ApiResult {
                generation: request.generation,
                url: request.url,
                result_key: request.result_key,
                result,
            };
            if inbox.send(message).is_err() {
                debug!("Session closed before API result arrived");
            }
        });
    }
}
