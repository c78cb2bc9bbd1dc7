//! One handler per route.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use seedkeeper_rules::preview_rule;
use seedkeeper_scheduler::build_preview_context;
use serde_json::json;

use crate::dto::{ActivityRunPageDto, ActivityRunQuery, ApplyNowResponse, PreviewRequest, PreviewResponse};
use crate::error::ApiError;
use crate::state::ApiState;

/// Liveness probe. Never depends on any collaborator being reachable.
pub(crate) async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Prometheus text exposition of the process's metrics.
pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<String, ApiError> {
    state.metrics.gather().map_err(|err| ApiError::internal(err.to_string()))
}

/// Trigger an immediate, out-of-schedule cycle for `instance`.
pub(crate) async fn apply_now(
    State(state): State<Arc<ApiState>>,
    Path(instance): Path<String>,
) -> Result<Json<ApplyNowResponse>, ApiError> {
    let report = state.scheduler.apply_now(&instance).await?;
    Ok(Json(report.into()))
}

/// Preview one rule's delete condition against `instance`'s current
/// torrent snapshot without applying it.
pub(crate) async fn preview_rule_route(
    State(state): State<Arc<ApiState>>,
    Path(instance): Path<String>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let deps = state
        .scheduler
        .deps(&instance)
        .await
        .ok_or_else(|| ApiError::not_found(format!("no worker running for instance '{instance}'")))?;
    let snapshot = build_preview_context(&deps, &instance, &request.rule).await?;
    let mut ctx = snapshot.context();
    let result = preview_rule(&request.rule, &snapshot.torrents, &mut ctx, request.mode.into(), request.example_limit);
    Ok(Json(result.into()))
}

/// Page back through a past cycle's activity items.
pub(crate) async fn get_activity_run(
    State(state): State<Arc<ApiState>>,
    Path((instance, activity_id)): Path<(String, uuid::Uuid)>,
    Query(query): Query<ActivityRunQuery>,
) -> Result<Json<ActivityRunPageDto>, ApiError> {
    state
        .activity_store
        .get(&instance, activity_id, query.offset, query.limit)
        .map(|page| Json(page.into()))
        .ok_or_else(|| ApiError::not_found(format!("no activity run '{activity_id}' for instance '{instance}'")))
}

/// Drop `instance`'s cached hardlink index, forcing a rebuild on the next cycle.
pub(crate) async fn invalidate_hardlink_index(
    State(state): State<Arc<ApiState>>,
    Path(instance): Path<String>,
) -> Result<Response, ApiError> {
    let deps = state
        .scheduler
        .deps(&instance)
        .await
        .ok_or_else(|| ApiError::not_found(format!("no worker running for instance '{instance}'")))?;
    deps.hardlink_cache.invalidate(&instance).await;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use seedkeeper_client::{ClientError, TorrentClient, TorrentFile};
    use seedkeeper_core::rule::{ActionConditions, Rule};
    use seedkeeper_indices::HardlinkIndexCache;
    use seedkeeper_scheduler::{CycleDeps, SchedulerRegistry};
    use seedkeeper_store::ActivityRunStore;

    use async_trait::async_trait;

    use super::*;

    struct EmptyClient;

    #[async_trait]
    impl TorrentClient for EmptyClient {
        async fn list_torrents(&self, _instance: &str) -> Result<Vec<seedkeeper_core::model::Torrent>, ClientError> {
            Ok(Vec::new())
        }

        async fn get_files(
            &self,
            _instance: &str,
            _hashes: &[String],
        ) -> Result<HashMap<String, Vec<TorrentFile>>, ClientError> {
            Ok(HashMap::new())
        }

        async fn get_free_space(&self, _instance: &str) -> Result<i64, ClientError> {
            Ok(0)
        }
    }

    struct EmptyRuleStore;

    #[async_trait]
    impl seedkeeper_store::RuleStore for EmptyRuleStore {
        async fn list_rules(&self, _instance: &str) -> Result<Vec<Rule>, seedkeeper_store::RuleStoreError> {
            Ok(Vec::new())
        }
    }

    fn deps() -> CycleDeps {
        CycleDeps {
            client: Arc::new(EmptyClient),
            rule_store: Arc::new(EmptyRuleStore),
            quality_store: None,
            activity_store: Arc::new(ActivityRunStore::default()),
            hardlink_cache: Arc::new(HardlinkIndexCache::new(Duration::from_secs(300))),
            release_parser: None,
            program_runner: None,
            unregistered: None,
            tracker_display_names: Arc::new(std::collections::HashMap::new()),
            metrics: None,
            events: None,
            batch_size: 10,
            debounce_window: Duration::from_secs(0),
            dry_run: true,
        }
    }

    fn state() -> Arc<ApiState> {
        Arc::new(ApiState::new(
            Arc::new(SchedulerRegistry::new()),
            Arc::new(ActivityRunStore::default()),
            seedkeeper_telemetry::Metrics::new().expect("metrics"),
        ))
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let body = health().await;
        assert_eq!(body.0["status"], "ok");
    }

    #[tokio::test]
    async fn apply_now_against_unknown_instance_is_not_found() {
        let state = state();
        let err = state.scheduler.apply_now("missing").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn preview_against_unregistered_instance_is_not_found() {
        let state = state();
        let request = PreviewRequest {
            rule: Rule {
                id: "r1".into(),
                name: "demo".into(),
                instance_id: "inst".into(),
                enabled: true,
                sort_order: 0,
                tracker_pattern: "*".into(),
                actions: ActionConditions::default(),
                free_space_source: None,
            },
            mode: crate::dto::PreviewModeDto::Eligible,
            example_limit: 10,
        };
        let result = preview_rule_route(State(state), Path("inst".into()), Json(request)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn invalidate_against_running_instance_succeeds() {
        let state = state();
        state.scheduler.start("inst".into(), deps(), seedkeeper_config::CoreConfig::default()).await;

        let response = invalidate_hardlink_index(State(Arc::clone(&state)), Path("inst".into())).await;
        assert!(response.is_ok());

        state.scheduler.stop("inst").await;
    }
}
