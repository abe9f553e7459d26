use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    routing::get,
    Router,
};
use tokio::{net::TcpListener, time::sleep};
use tower::ServiceExt;

use webpack_sidecar::server::runtime::build_router;

use crate::common::{build_state, scratch_project, test_sidecar_config};

const ASSET_BODY: &str = "console.log(\"asset\");";

fn upstream_app() -> Router {
    Router::new().route(
        "/assets/app.js",
        get(|| async {
            (
                [(header::CONTENT_TYPE, "application/javascript")],
                ASSET_BODY,
            )
        }),
    )
}

async fn spawn_upstream(app: Router) -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind upstream listener")?;
    let port = listener.local_addr()?.port();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(port)
}

#[tokio::test]
async fn assets_are_forwarded_from_the_dev_server() -> Result<()> {
    let upstream_port = spawn_upstream(upstream_app()).await?;
    let temp = scratch_project()?;
    let state = build_state(
        test_sidecar_config(upstream_port, 3),
        temp.path().to_path_buf(),
    )?;
    state.supervisor.start().await?;

    let response = build_router(state.clone())
        .oneshot(Request::builder().uri("/assets/app.js").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("application/javascript")
    );
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(body.as_ref(), ASSET_BODY.as_bytes());

    state.supervisor.stop().await?;
    Ok(())
}

#[tokio::test]
async fn unknown_assets_map_to_not_found() -> Result<()> {
    let upstream_port = spawn_upstream(upstream_app()).await?;
    let temp = scratch_project()?;
    let state = build_state(
        test_sidecar_config(upstream_port, 3),
        temp.path().to_path_buf(),
    )?;
    state.supervisor.start().await?;

    let response = build_router(state.clone())
        .oneshot(
            Request::builder()
                .uri("/assets/missing.js")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(body.as_ref(), b"Asset not found");

    state.supervisor.stop().await?;
    Ok(())
}

#[tokio::test]
async fn proxy_retries_until_the_dev_server_listens() -> Result<()> {
    // Reserve a port, then bring up the upstream only after a delay so the
    // first proxy attempts see a connection refused.
    let reserved = TcpListener::bind("127.0.0.1:0").await?;
    let upstream_port = reserved.local_addr()?.port();
    drop(reserved);

    tokio::spawn(async move {
        sleep(Duration::from_millis(500)).await;
        let listener = TcpListener::bind(("127.0.0.1", upstream_port))
            .await
            .expect("reserved port should be free");
        let _ = axum::serve(listener, upstream_app()).await;
    });

    let temp = scratch_project()?;
    let state = build_state(
        test_sidecar_config(upstream_port, 3),
        temp.path().to_path_buf(),
    )?;
    state.supervisor.start().await?;

    let response = build_router(state.clone())
        .oneshot(Request::builder().uri("/assets/app.js").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);

    state.supervisor.stop().await?;
    Ok(())
}
