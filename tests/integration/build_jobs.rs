use std::{fs, time::Duration};

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use tokio::time::sleep;
use tower::ServiceExt;

use webpack_sidecar::server::runtime::build_router;

use crate::common::{
    build_state, enable_fast_timeout, json_body, scratch_project, test_sidecar_config,
    test_sidecar_config_with_ttl,
};

fn build_request(body: &Value) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri("/build")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body)?))?)
}

#[tokio::test]
async fn build_returns_bundle_metadata() -> Result<()> {
    enable_fast_timeout();
    let temp = scratch_project()?;
    let state = build_state(test_sidecar_config(9381, 20), temp.path().to_path_buf())?;

    let request = build_request(&json!({
        "env_overrides": { "MOCK_WEBPACK_BEHAVIOR": "success" }
    }))?;
    let response = build_router(state).oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await?;
    assert_eq!(payload["status"], "succeeded");
    assert!(
        payload["bundle_path"]
            .as_str()
            .is_some_and(|path| path.ends_with("dist/app.bundle.js")),
        "payload: {payload}"
    );
    assert!(payload["bundle_sha256"].as_str().is_some());
    assert!(payload["bundle_size"].as_u64().is_some_and(|size| size > 0));
    assert!(payload["job_id"].as_str().is_some());
    Ok(())
}

#[tokio::test]
async fn failing_build_maps_to_build_failed_report() -> Result<()> {
    enable_fast_timeout();
    let temp = scratch_project()?;
    let state = build_state(test_sidecar_config(9381, 20), temp.path().to_path_buf())?;

    let request = build_request(&json!({
        "env_overrides": { "MOCK_WEBPACK_BEHAVIOR": "fail" }
    }))?;
    let response = build_router(state).oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let report = json_body(response).await?;
    assert_eq!(report["code"], "build_failed");
    assert_eq!(report["retryable"], true);
    assert_eq!(report["webpack_exit_code"], 2);
    assert!(report["job_id"].as_str().is_some());
    Ok(())
}

#[tokio::test]
async fn hanging_build_times_out() -> Result<()> {
    enable_fast_timeout();
    let temp = scratch_project()?;
    let state = build_state(test_sidecar_config(9381, 1), temp.path().to_path_buf())?;

    let request = build_request(&json!({
        "env_overrides": { "MOCK_WEBPACK_BEHAVIOR": "hang" }
    }))?;
    let response = build_router(state).oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let report = json_body(response).await?;
    assert_eq!(report["code"], "timeout");
    assert_eq!(report["retryable"], true);
    Ok(())
}

#[tokio::test]
async fn missing_entry_is_rejected() -> Result<()> {
    enable_fast_timeout();
    let temp = scratch_project()?;
    fs::remove_file(temp.path().join("index.js"))?;
    let state = build_state(test_sidecar_config(9381, 20), temp.path().to_path_buf())?;

    let response = build_router(state).oneshot(build_request(&json!({}))?).await?;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let report = json_body(response).await?;
    assert_eq!(report["code"], "entry_missing");
    assert_eq!(report["retryable"], false);
    Ok(())
}

#[tokio::test]
async fn job_report_includes_bundle_digest() -> Result<()> {
    enable_fast_timeout();
    let temp = scratch_project()?;
    let state = build_state(test_sidecar_config(9381, 20), temp.path().to_path_buf())?;

    let build_response = build_router(state.clone())
        .oneshot(build_request(&json!({}))?)
        .await?;
    assert_eq!(build_response.status(), StatusCode::OK);
    let build_payload = json_body(build_response).await?;
    let job_id = build_payload["job_id"].as_str().expect("job_id").to_string();

    let fetch_response = build_router(state)
        .oneshot(
            Request::builder()
                .uri(format!("/jobs/{job_id}"))
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(fetch_response.status(), StatusCode::OK);
    let report = json_body(fetch_response).await?;
    assert_eq!(report["status"], "succeeded");
    assert_eq!(report["job_id"], Value::String(job_id));
    assert_eq!(report["bundle_sha256"], build_payload["bundle_sha256"]);
    assert!(report["ttl_seconds"].as_u64().is_some_and(|ttl| ttl > 0));
    assert!(
        report["log_excerpt"]
            .as_str()
            .is_some_and(|log| log.contains("webpack compiled")),
        "report: {report}"
    );
    Ok(())
}

#[tokio::test]
async fn failed_job_lookup_reports_no_bundle() -> Result<()> {
    enable_fast_timeout();
    let temp = scratch_project()?;
    let state = build_state(test_sidecar_config(9381, 20), temp.path().to_path_buf())?;

    let build_response = build_router(state.clone())
        .oneshot(build_request(&json!({
            "env_overrides": { "MOCK_WEBPACK_BEHAVIOR": "fail" }
        }))?)
        .await?;
    let report = json_body(build_response).await?;
    let job_id = report["job_id"].as_str().expect("job_id").to_string();

    let fetch_response = build_router(state)
        .oneshot(
            Request::builder()
                .uri(format!("/jobs/{job_id}"))
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(fetch_response.status(), StatusCode::CONFLICT);
    let lookup_report = json_body(fetch_response).await?;
    assert_eq!(lookup_report["code"], "build_failed_no_bundle");
    Ok(())
}

#[tokio::test]
async fn expired_job_reports_job_expired() -> Result<()> {
    enable_fast_timeout();
    let temp = scratch_project()?;
    let state = build_state(
        test_sidecar_config_with_ttl(9381, 20, 1),
        temp.path().to_path_buf(),
    )?;

    let build_response = build_router(state.clone())
        .oneshot(build_request(&json!({}))?)
        .await?;
    assert_eq!(build_response.status(), StatusCode::OK);
    let build_payload = json_body(build_response).await?;
    let job_id = build_payload["job_id"].as_str().expect("job_id").to_string();

    sleep(Duration::from_secs(2)).await;

    let fetch_response = build_router(state)
        .oneshot(
            Request::builder()
                .uri(format!("/jobs/{job_id}"))
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(fetch_response.status(), StatusCode::NOT_FOUND);
    let report = json_body(fetch_response).await?;
    assert_eq!(report["code"], "job_expired");
    Ok(())
}
