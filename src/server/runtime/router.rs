use std::{path::PathBuf, sync::Arc};

use axum::{
    extract::{Path as RoutePath, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::{
    bundler::{
        self,
        history::{JobLookupError, JobLookupRequest},
        proxy::AssetPayload,
        AssetProxy, BuildHistory, BundlerJobQueue, DevServer, WebpackConfig,
    },
    lib::errors::{AssetProxyError, WebpackBuildError},
    server::config::SidecarConfig,
};

/// Shared state behind every route.
pub struct SidecarState {
    pub config: SidecarConfig,
    pub record: WebpackConfig,
    pub supervisor: DevServer,
    pub proxy: AssetProxy,
    pub queue: BundlerJobQueue,
    pub history: BuildHistory,
    pub project_root: PathBuf,
}

/// Mount the sidecar routes on a fresh router.
pub fn build_router(state: Arc<SidecarState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/assets/*path", get(serve_asset))
        .route("/build", post(trigger_build))
        .route("/jobs/:job_id", get(fetch_job))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(State(state): State<Arc<SidecarState>>) -> Response {
    let devserver = state.supervisor.status().await;
    Json(serde_json::json!({
        "status": "ok",
        "mode": state.record.mode,
        "devserver": devserver,
    }))
    .into_response()
}

/// Forward an asset request to the dev server, mirroring its body and
/// content type.
async fn serve_asset(
    State(state): State<Arc<SidecarState>>,
    RoutePath(path): RoutePath<String>,
) -> Response {
    if !state.supervisor.status().await.running {
        let err = AssetProxyError::NotRunning;
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }

    match state.proxy.fetch_asset(&format!("assets/{path}")).await {
        Ok(payload) => asset_response(payload),
        Err(err) => proxy_error_response(err),
    }
}

fn asset_response(payload: AssetPayload) -> Response {
    let mut response = payload.body.into_response();
    if let Some(content_type) = payload
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
    {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }
    response
}

fn proxy_error_response(err: AssetProxyError) -> Response {
    let status = match err {
        AssetProxyError::UpstreamStatus { .. } => StatusCode::NOT_FOUND,
        AssetProxyError::NotRunning
        | AssetProxyError::DeadlineExceeded
        | AssetProxyError::Transport { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string()).into_response()
}

/// Run one bundle build through the queue and store the outcome.
async fn trigger_build(
    State(state): State<Arc<SidecarState>>,
    Json(request): Json<bundler::BundleBuildRequest>,
) -> Response {
    if let Err(err) = request.validate() {
        return failure_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            bundler::validation_error_to_report(err),
        );
    }

    let job_id = Uuid::new_v4();
    let _ticket = state.queue.wait_for_turn(job_id).await;
    let result = bundler::run_build(
        &request,
        &state.record,
        &state.config,
        &state.project_root,
        job_id,
    )
    .await;
    state.queue.finish_job(job_id).await;

    match result {
        Ok(resp) => {
            if let Err(store_err) = state
                .history
                .record_success(
                    job_id,
                    PathBuf::from(&resp.bundle_path),
                    resp.bundle_sha256.clone(),
                    resp.bundle_size,
                    resp.log_excerpt.clone(),
                    Utc::now(),
                )
                .await
            {
                let err = WebpackBuildError::from(store_err);
                return failure_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    bundler::runtime_error_to_report(err, job_id),
                );
            }
            (StatusCode::OK, Json(resp)).into_response()
        }
        Err(err) => {
            record_build_failure(&state, job_id, &err).await;
            let status = build_error_status(&err);
            failure_response(status, bundler::runtime_error_to_report(err, job_id))
        }
    }
}

async fn record_build_failure(state: &SidecarState, job_id: Uuid, err: &WebpackBuildError) {
    let log_excerpt = match err {
        WebpackBuildError::CommandFailed { message, .. } => message.clone(),
        _ => err.to_string(),
    };
    if let Err(store_err) = state
        .history
        .record_failure(job_id, log_excerpt, Utc::now())
        .await
    {
        tracing::warn!(
            target: "webpack_sidecar::bundler",
            job_id = %job_id,
            error = %store_err,
            "Failed to record build failure"
        );
    }
}

fn build_error_status(err: &WebpackBuildError) -> StatusCode {
    match err {
        WebpackBuildError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        WebpackBuildError::HistoryFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        WebpackBuildError::CommandFailed { .. }
        | WebpackBuildError::EntryMissing { .. }
        | WebpackBuildError::BundleMissing { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// Return the stored record for one build job.
async fn fetch_job(
    State(state): State<Arc<SidecarState>>,
    RoutePath(job_id): RoutePath<String>,
) -> Response {
    let request = JobLookupRequest {
        job_id,
        include_logs: true,
    };
    match bundler::lookup_job(&state.history, request).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => {
            let status = lookup_error_status(&err);
            failure_response(status, bundler::lookup_error_to_report(err))
        }
    }
}

fn lookup_error_status(err: &JobLookupError) -> StatusCode {
    match err {
        JobLookupError::InvalidJobId { .. } => StatusCode::BAD_REQUEST,
        JobLookupError::JobNotFound { .. } | JobLookupError::JobExpired { .. } => {
            StatusCode::NOT_FOUND
        }
        JobLookupError::BuildFailedNoBundle { .. } => StatusCode::CONFLICT,
        JobLookupError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure_response(status: StatusCode, report: serde_json::Value) -> Response {
    (status, Json(report)).into_response()
}
