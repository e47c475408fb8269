//! 1:1 forwarding of protected `/users` and `/posts` routes.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    routing::any,
    Extension, Router,
};

use common::{AppError, AppResult};
use domain::Identity;

use crate::clients::{ClientError, OutboundRequest, ServiceClient, UpstreamResponse};
use crate::state::AppState;

/// Create forwarding routes for the protected service prefixes.
pub fn proxy_routes() -> Router<AppState> {
    Router::new()
        .route("/users", any(forward_to_user_service))
        .route("/users/*rest", any(forward_to_user_service))
        .route("/posts", any(forward_to_post_service))
        .route("/posts/*rest", any(forward_to_post_service))
}

async fn forward_to_user_service(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<UpstreamResponse> {
    let path = downstream_path("/users", &uri)?;
    forward(state.user_client.service(), method, &path, Some(&caller), &headers, body).await
}

async fn forward_to_post_service(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<UpstreamResponse> {
    let path = downstream_path("/posts", &uri)?;
    forward(state.post_client.service(), method, &path, Some(&caller), &headers, body).await
}

/// Path and query to send downstream for a request routed under `prefix`.
///
/// The downstream URL is built by appending the path to the service base
/// URL, and URL parsing resolves dot segments. A path that contains one,
/// raw or percent-encoded, or an encoded separator is refused with 400 so
/// the request cannot reach a route outside `prefix`.
pub(crate) fn downstream_path(prefix: &str, uri: &Uri) -> AppResult<String> {
    let path = uri.path();
    let under_prefix = path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'));
    if !under_prefix || path.split(['/', '\\']).any(is_unsafe_segment) {
        tracing::warn!(path = %path, "Refusing to forward path");
        return Err(AppError::validation("Invalid request path"));
    }

    Ok(match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    })
}

fn is_unsafe_segment(segment: &str) -> bool {
    let lower = segment.to_ascii_lowercase();
    if lower.contains("%2f") || lower.contains("%5c") {
        return true;
    }
    let decoded = lower.replace("%2e", ".");
    decoded == "." || decoded == ".."
}

/// Send the inbound request to `service` unchanged apart from the internal
/// headers, and hand back whatever it answers.
pub(crate) async fn forward(
    service: &ServiceClient,
    method: Method,
    path: &str,
    caller: Option<&Identity>,
    headers: &HeaderMap,
    body: Bytes,
) -> AppResult<UpstreamResponse> {
    let mut request = OutboundRequest::new(method, path).headers(headers).body(body);
    if let Some(caller) = caller {
        request = request.caller(caller);
    }

    service.request(request).await.map_err(relay_error)
}

/// Any status the service answered with goes back verbatim; only a missing
/// answer becomes 503.
fn relay_error(err: ClientError) -> AppError {
    match err {
        ClientError::Upstream(e) => e.into_relay(),
        transport => transport.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn server_errors_are_relayed_not_masked() {
        let err = relay_error(ClientError::upstream(
            "post-service",
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"message":"boom"}"#,
        ));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = relay_error(ClientError::timeout("post-service"));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    fn path_for(prefix: &str, uri: &str) -> AppResult<String> {
        downstream_path(prefix, &uri.parse::<Uri>().unwrap())
    }

    #[test]
    fn ordinary_paths_keep_their_query() {
        assert_eq!(path_for("/posts", "/posts").unwrap(), "/posts");
        assert_eq!(
            path_for("/posts", "/posts/by-user/7?page=2").unwrap(),
            "/posts/by-user/7?page=2"
        );
        assert_eq!(path_for("/users", "/users/details/3").unwrap(), "/users/details/3");
        // Dots inside a segment are fine.
        assert_eq!(path_for("/posts", "/posts/v1.2/..x").unwrap(), "/posts/v1.2/..x");
    }

    #[test]
    fn dot_segments_are_refused() {
        for uri in [
            "/posts/../internal/admin",
            "/posts/%2e%2e/internal/admin",
            "/posts/%2E%2E/internal/admin",
            "/posts/.%2e/internal/admin",
            "/posts/./x",
            "/posts/%2e",
            "/posts/a/../../internal",
        ] {
            let err = path_for("/posts", uri).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[test]
    fn encoded_separators_are_refused() {
        for uri in ["/posts/..%2finternal", "/posts/a%2Fb", "/posts/..%5Cinternal"] {
            assert!(path_for("/posts", uri).is_err(), "{uri}");
        }
    }

    #[test]
    fn path_must_stay_under_prefix() {
        assert!(path_for("/posts", "/postsx/1").is_err());
        assert!(path_for("/users", "/posts/1").is_err());
    }
}
