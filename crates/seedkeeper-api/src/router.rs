//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::{HeaderName, Request};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::handlers::{apply_now, get_activity_run, health, invalidate_hardlink_index, metrics, preview_rule_route};
use crate::state::ApiState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Axum router wrapper that hosts the inbound consumer API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct the server from its shared state.
    #[must_use]
    pub fn new(state: Arc<ApiState>) -> Self {
        let header = HeaderName::from_static(REQUEST_ID_HEADER);

        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(move |request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(&header)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_response(|response: &axum::response::Response, latency: Duration, span: &Span| {
                span.record("status_code", response.status().as_u16());
                span.record("latency_ms", u64::try_from(latency.as_millis()).unwrap_or(u64::MAX));
            });

        let layered = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(HeaderName::from_static(REQUEST_ID_HEADER), MakeRequestUuid))
            .layer(trace_layer)
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(REQUEST_ID_HEADER)));

        let router = Self::routes().route_layer(layered).with_state(state);

        Self { router }
    }

    fn routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route("/instances/{instance}/apply-now", post(apply_now))
            .route("/instances/{instance}/rules/preview", post(preview_rule_route))
            .route("/instances/{instance}/activity/{activity_id}", get(get_activity_run))
            .route(
                "/instances/{instance}/hardlink-index/invalidate",
                post(invalidate_hardlink_index),
            )
    }

    /// Serve the API on `addr` until the process is terminated.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        tracing::info!(%addr, "starting seedkeeper-api");
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router.into_make_service()).await?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use seedkeeper_scheduler::SchedulerRegistry;
    use seedkeeper_store::ActivityRunStore;
    use tower::util::ServiceExt;

    use super::*;

    fn state() -> Arc<ApiState> {
        Arc::new(ApiState::new(
            Arc::new(SchedulerRegistry::new()),
            Arc::new(ActivityRunStore::default()),
            seedkeeper_telemetry::Metrics::new().expect("metrics"),
        ))
    }

    #[tokio::test]
    async fn health_route_returns_ok() {
        let server = ApiServer::new(state());
        let response = server
            .router()
            .clone()
            .oneshot(HttpRequest::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn apply_now_for_unknown_instance_is_service_unavailable() {
        let server = ApiServer::new(state());
        let response = server
            .router()
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/instances/missing/apply-now")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
