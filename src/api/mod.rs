use crate::{
    api::handlers::{
        dropdown::{self, units::LabelLanguage},
        health, preflight, terminals,
    },
    backend,
};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    http::{
        HeaderName, HeaderValue, Request,
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
    },
    routing::{get, post},
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer,
    set_header::{SetRequestHeaderLayer, SetResponseHeaderLayer},
    trace::TraceLayer,
};
use tracing::{Span, debug_span, info};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod error;
pub mod handlers;
mod openapi;

const CORS_ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Shared, read-only request context.
#[derive(Debug)]
pub struct AppState {
    pub backend: backend::Client,
    /// Language of the category prefix on local units.
    pub unit_labels: LabelLanguage,
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    openapi::ApiDoc::openapi()
}

/// Build the application router.
///
/// Each endpoint answers `OPTIONS` with `ok`, rejects other verbs with a JSON
/// `405`, and tags every response with permissive CORS headers.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let terminals = with_cors(
        Router::new().route(
            "/create-terminal",
            post(terminals::create_terminal)
                .options(preflight)
                .fallback(terminals::method_not_allowed),
        ),
        "POST, OPTIONS",
    );

    let dropdown = with_cors(
        Router::new().route(
            "/get-dropdown-data",
            get(dropdown::dropdown)
                .options(preflight)
                .fallback(dropdown::method_not_allowed),
        ),
        "GET, OPTIONS",
    );

    Router::new()
        .route("/health", get(health::health))
        .merge(terminals)
        .merge(dropdown)
        .layer(Extension(state))
}

fn with_cors(router: Router, methods: &'static str) -> Router {
    router
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(methods),
        ))
}

/// Serve the API until SIGINT/SIGTERM.
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn new(port: u16, state: AppState) -> Result<()> {
    let app = router(Arc::new(state)).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    );

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let method = request.method().as_str();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", method, path, request_id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn test_state(backend_url: &str, service_role_key: Option<&str>) -> Arc<AppState> {
    let key = service_role_key.map(|key| secrecy::SecretString::from(key.to_string()));
    Arc::new(AppState {
        backend: backend::Client::new(backend_url, key).unwrap(),
        unit_labels: LabelLanguage::Es,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::{
        body::to_bytes,
        http::{Method, StatusCode},
    };
    use tower::ServiceExt;

    async fn options(uri: &str) -> Result<(StatusCode, HeaderMapSnapshot, String)> {
        let response = router(test_state("http://127.0.0.1:9", Some("service-key")))
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from("{ not json"))?,
            )
            .await?;
        let status = response.status();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };
        let snapshot = HeaderMapSnapshot {
            origin: header(ACCESS_CONTROL_ALLOW_ORIGIN),
            headers: header(ACCESS_CONTROL_ALLOW_HEADERS),
            methods: header(ACCESS_CONTROL_ALLOW_METHODS),
        };
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, snapshot, String::from_utf8(bytes.to_vec())?))
    }

    struct HeaderMapSnapshot {
        origin: Option<String>,
        headers: Option<String>,
        methods: Option<String>,
    }

    #[tokio::test]
    async fn preflight_on_create_terminal() -> Result<()> {
        let (status, cors, body) = options("/create-terminal").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
        assert_eq!(cors.origin.as_deref(), Some("*"));
        assert_eq!(cors.headers.as_deref(), Some(CORS_ALLOW_HEADERS));
        assert_eq!(cors.methods.as_deref(), Some("POST, OPTIONS"));
        Ok(())
    }

    #[tokio::test]
    async fn preflight_on_dropdown() -> Result<()> {
        let (status, cors, body) = options("/get-dropdown-data?type=countries").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
        assert_eq!(cors.origin.as_deref(), Some("*"));
        assert_eq!(cors.methods.as_deref(), Some("GET, OPTIONS"));
        Ok(())
    }

    #[test]
    fn openapi_documents_every_endpoint() {
        let doc = openapi();
        for path in ["/health", "/create-terminal", "/get-dropdown-data"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));
    }
}
