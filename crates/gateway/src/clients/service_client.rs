//! Timeout-bound HTTP client for one downstream service.
//!
//! Every failure is one of two kinds:
//! - [`TransportError`]: the service gave no usable answer (unreachable,
//!   timed out, reset, or an undecodable success body).
//! - [`UpstreamError`]: the service answered with a 4xx/5xx status. The body
//!   is kept verbatim so it can be relayed to the caller.
//!
//! Every call carries `x-internal-secret`. Calls made on behalf of an
//! authenticated caller also carry `x-user-id`; the id is never sent alone.

use std::time::Duration;

use axum::{
    body::Bytes,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use common::{AppError, ServiceClientConfig};
use domain::{Identity, HEADER_INTERNAL_SECRET, HEADER_USER_ID};

/// Headers never copied from an inbound request onto a downstream call.
const STRIPPED_HEADERS: &[&str] = &[
    "host",
    "authorization",
    "content-length",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    HEADER_USER_ID,
    HEADER_INTERNAL_SECRET,
];

/// The dependency did not deliver a usable answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("undecodable response: {0}")]
    Decode(String),
    #[error("transport failure: {0}")]
    Other(String),
}

/// The dependency answered with an error status.
#[derive(Error, Debug, Clone)]
#[error("{service} answered {status}")]
pub struct UpstreamError {
    pub service: String,
    pub status: StatusCode,
    pub body: Bytes,
    pub content_type: Option<HeaderValue>,
}

impl UpstreamError {
    /// Hand the answer back to the original caller unchanged.
    pub fn into_relay(self) -> AppError {
        AppError::UpstreamRejected {
            status: self.status,
            body: self.body,
            content_type: self.content_type,
        }
    }
}

/// Failure of a downstream call.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("{service}: {source}")]
    Transport {
        service: String,
        #[source]
        source: TransportError,
    },
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ClientError {
    pub fn transport(service: impl Into<String>, source: TransportError) -> Self {
        ClientError::Transport {
            service: service.into(),
            source,
        }
    }

    pub fn timeout(service: impl Into<String>) -> Self {
        Self::transport(service, TransportError::Timeout)
    }

    pub fn upstream(service: impl Into<String>, status: StatusCode, body: impl Into<Bytes>) -> Self {
        ClientError::Upstream(UpstreamError {
            service: service.into(),
            status,
            body: body.into(),
            content_type: Some(HeaderValue::from_static("application/json")),
        })
    }

    /// Service that produced the failure.
    pub fn service(&self) -> &str {
        match self {
            ClientError::Transport { service, .. } => service,
            ClientError::Upstream(e) => &e.service,
        }
    }

    /// Status returned by the service, if it answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Transport { .. } => None,
            ClientError::Upstream(e) => Some(e.status),
        }
    }

    /// True for outage signals: no answer, or a 5xx answer.
    pub fn is_unavailable(&self) -> bool {
        match self {
            ClientError::Transport { .. } => true,
            ClientError::Upstream(e) => e.status.is_server_error(),
        }
    }
}

/// Default mapping: outages become 503, client errors are relayed.
impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        if err.is_unavailable() {
            warn!(service = err.service(), error = %err, "Downstream service unavailable");
            return AppError::service_unavailable(err.service());
        }
        match err {
            ClientError::Upstream(e) => e.into_relay(),
            ClientError::Transport { service, .. } => AppError::service_unavailable(service),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Successful (2xx/3xx) answer from a downstream service.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        match self.content_type {
            Some(value) => {
                response.headers_mut().insert(header::CONTENT_TYPE, value);
            }
            None => {
                response.headers_mut().remove(header::CONTENT_TYPE);
            }
        }
        response
    }
}

/// One downstream call.
pub struct OutboundRequest<'a> {
    method: Method,
    path: String,
    caller: Option<&'a Identity>,
    headers: Option<&'a HeaderMap>,
    body: Option<Bytes>,
    timeout: Option<Duration>,
}

impl<'a> OutboundRequest<'a> {
    /// `path` includes any query string, e.g. `/posts/from-users?ids=1,2`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            caller: None,
            headers: None,
            body: None,
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Act on behalf of an authenticated caller.
    pub fn caller(mut self, caller: &'a Identity) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Inbound headers to pass along; internal and hop-by-hop headers are dropped.
    pub fn headers(mut self, headers: &'a HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// Override the client's default timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// HTTP client wrapper for one downstream service.
pub struct ServiceClient {
    name: String,
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    internal_secret: HeaderValue,
}

impl ServiceClient {
    /// Build a pooled client for the configured service.
    pub fn new(config: &ServiceClientConfig, internal_secret: &str) -> Result<Self, ClientSetupError> {
        debug!("Configuring {} client for {}", config.name, config.base_url);

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        let mut internal_secret = HeaderValue::from_str(internal_secret)
            .map_err(|_| ClientSetupError::InvalidSecret)?;
        internal_secret.set_sensitive(true);

        Ok(Self {
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            timeout: config.request_timeout(),
            internal_secret,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request. 4xx/5xx answers come back as [`ClientError::Upstream`].
    pub async fn request(&self, request: OutboundRequest<'_>) -> ClientResult<UpstreamResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let timeout = request.timeout.unwrap_or(self.timeout);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .timeout(timeout)
            .headers(self.outbound_headers(request.caller, request.headers));
        if let Some(body) = request.body {
            if !body.is_empty() {
                builder = builder.body(body);
            }
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        debug!(
            service = %self.name,
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            "Downstream call completed"
        );

        if status.is_client_error() || status.is_server_error() {
            return Err(ClientError::Upstream(UpstreamError {
                service: self.name.clone(),
                status,
                body,
                content_type,
            }));
        }

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        caller: Option<&Identity>,
    ) -> ClientResult<T> {
        let mut request = OutboundRequest::get(path);
        if let Some(caller) = caller {
            request = request.caller(caller);
        }
        let response = self.request(request).await?;
        serde_json::from_slice(&response.body).map_err(|e| {
            ClientError::transport(&self.name, TransportError::Decode(e.to_string()))
        })
    }

    /// Check if the service answers its health endpoint.
    pub async fn check_health(&self) -> bool {
        match self.request(OutboundRequest::get("/health")).await {
            Ok(_) => true,
            Err(e) => {
                warn!(service = %self.name, error = %e, "Service health check failed");
                false
            }
        }
    }

    fn outbound_headers(&self, caller: Option<&Identity>, inbound: Option<&HeaderMap>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Some(inbound) = inbound {
            for (name, value) in inbound {
                if !is_stripped(name) {
                    headers.append(name.clone(), value.clone());
                }
            }
        }

        headers.insert(HEADER_INTERNAL_SECRET, self.internal_secret.clone());
        if let Some(caller) = caller {
            headers.insert(HEADER_USER_ID, HeaderValue::from(caller.user_id));
        }

        headers
    }

    fn transport_error(&self, err: reqwest::Error) -> ClientError {
        let source = if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        };
        ClientError::transport(&self.name, source)
    }
}

fn is_stripped(name: &HeaderName) -> bool {
    STRIPPED_HEADERS.contains(&name.as_str())
}

/// Client construction errors.
#[derive(Error, Debug)]
pub enum ClientSetupError {
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
    #[error("internal secret is not a valid header value")]
    InvalidSecret,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wiremock::matchers::{body_string, header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "internal-secret-for-tests-0123456789";

    fn client(base_url: &str, timeout_ms: u64) -> ServiceClient {
        let mut config = ServiceClientConfig::new("user-service", base_url);
        config.request_timeout_ms = timeout_ms;
        ServiceClient::new(&config, SECRET).unwrap()
    }

    fn caller(id: i64) -> Identity {
        let now = Utc::now();
        Identity::new(id, "alice", "user", now, now).unwrap()
    }

    #[tokio::test]
    async fn attaches_both_internal_headers_for_callers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/following"))
            .and(header_eq("x-user-id", "12"))
            .and(header_eq("x-internal-secret", SECRET))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"following": [1]})))
            .expect(1)
            .mount(&server)
            .await;

        let value: serde_json::Value = client(&server.uri(), 1000)
            .get_json("/users/following", Some(&caller(12)))
            .await
            .unwrap();
        assert_eq!(value["following"][0], 1);
    }

    #[tokio::test]
    async fn anonymous_calls_carry_secret_only() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(header_eq("x-internal-secret", SECRET))
            .and(body_string("{\"username\":\"a\"}"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let response = client(&server.uri(), 1000)
            .request(
                OutboundRequest::new(Method::POST, "/auth/login")
                    .body(Bytes::from_static(b"{\"username\":\"a\"}")),
            )
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);

        let received = server.received_requests().await.unwrap();
        assert!(received[0].headers.get("x-user-id").is_none());
    }

    #[tokio::test]
    async fn spoofed_internal_headers_are_replaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/by-user"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut inbound = HeaderMap::new();
        inbound.insert("x-user-id", HeaderValue::from_static("1"));
        inbound.insert("x-internal-secret", HeaderValue::from_static("guess"));
        inbound.insert("authorization", HeaderValue::from_static("Bearer abc"));
        inbound.insert("accept-language", HeaderValue::from_static("en"));

        client(&server.uri(), 1000)
            .request(OutboundRequest::get("/posts/by-user").caller(&caller(7)).headers(&inbound))
            .await
            .unwrap();

        let received = server.received_requests().await.unwrap();
        let headers = &received[0].headers;
        assert_eq!(headers.get("x-user-id").unwrap(), "7");
        assert_eq!(headers.get("x-internal-secret").unwrap(), SECRET);
        assert!(headers.get("authorization").is_none());
        assert_eq!(headers.get("accept-language").unwrap(), "en");
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let err = client(&server.uri(), 50)
            .request(OutboundRequest::get("/users/5"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport { source: TransportError::Timeout, .. }
        ));
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn error_status_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/9"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_raw(r#"{"message":"User not found with id:9"}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let err = client(&server.uri(), 1000)
            .request(OutboundRequest::get("/users/9"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert!(!err.is_unavailable());
        match err {
            ClientError::Upstream(e) => {
                assert_eq!(&e.body[..], br#"{"message":"User not found with id:9"}"#);
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn server_errors_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = client(&server.uri(), 1000)
            .request(OutboundRequest::get("/posts/from-users").timeout(Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(err.service(), "user-service");
    }

    #[tokio::test]
    async fn unreachable_service_is_transport_error() {
        let err = client("http://127.0.0.1:1", 1000)
            .request(OutboundRequest::get("/health"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }));
    }

    #[tokio::test]
    async fn undecodable_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/from-users"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server.uri(), 1000)
            .get_json::<serde_json::Value>("/posts/from-users?limit=5", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport { source: TransportError::Decode(_), .. }
        ));
    }

    #[test]
    fn client_errors_map_to_app_errors() {
        let relayed: AppError =
            ClientError::upstream("post-service", StatusCode::NOT_FOUND, "{}").into();
        assert_eq!(relayed.status(), StatusCode::NOT_FOUND);

        let outage: AppError = ClientError::timeout("post-service").into();
        assert_eq!(outage.status(), StatusCode::SERVICE_UNAVAILABLE);

        let crashed: AppError =
            ClientError::upstream("post-service", StatusCode::INTERNAL_SERVER_ERROR, "boom").into();
        assert_eq!(crashed.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
