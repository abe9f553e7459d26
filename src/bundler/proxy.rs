//! Forwarding of asset requests to the webpack dev server.

use std::time::{Duration, Instant};

use tokio::time;
use tracing::debug;

use crate::{lib::errors::AssetProxyError, server::config::SidecarConfig};

/// Backoff grows by one step per failed connection attempt.
const ASSET_RETRY_STEP_MS: u64 = 50;

/// Body and content type returned by the dev server for one asset.
#[derive(Debug, Clone)]
pub struct AssetPayload {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Client for the dev server HTTP endpoint.
///
/// The deadline doubles as the wait for a freshly started dev server to
/// begin accepting connections.
#[derive(Clone)]
pub struct AssetProxy {
    client: reqwest::Client,
    origin: String,
    deadline: Duration,
}

impl AssetProxy {
    pub fn new(config: &SidecarConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            origin: config.devserver.origin(),
            deadline: config.devserver.startup_timeout(),
        }
    }

    /// Fetch one asset, retrying refused connections until the deadline.
    ///
    /// Anything other than a 200 from the dev server means the asset does
    /// not exist there.
    pub async fn fetch_asset(&self, asset_path: &str) -> Result<AssetPayload, AssetProxyError> {
        let url = format!(
            "{origin}/{path}",
            origin = self.origin,
            path = asset_path.trim_start_matches('/')
        );
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            if started.elapsed() >= self.deadline {
                return Err(AssetProxyError::DeadlineExceeded);
            }

            let outcome = self
                .client
                .get(&url)
                .timeout(self.deadline.saturating_sub(started.elapsed()))
                .send()
                .await;

            match outcome {
                Ok(response) if response.status() == reqwest::StatusCode::OK => {
                    let content_type = response
                        .headers()
                        .get(reqwest::header::CONTENT_TYPE)
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_string);
                    let body = response
                        .bytes()
                        .await
                        .map_err(|source| AssetProxyError::Transport { source })?
                        .to_vec();
                    return Ok(AssetPayload { content_type, body });
                }
                Ok(response) => {
                    return Err(AssetProxyError::UpstreamStatus {
                        status: response.status().as_u16(),
                    });
                }
                Err(source) if source.is_timeout() => {
                    return Err(AssetProxyError::DeadlineExceeded);
                }
                Err(source) if source.is_connect() => {
                    attempt += 1;
                    let backoff = Duration::from_millis(ASSET_RETRY_STEP_MS * u64::from(attempt));
                    debug!(
                        target: "webpack_sidecar::proxy",
                        attempt,
                        url = %url,
                        "Dev server refused the connection; backing off"
                    );
                    time::sleep(backoff).await;
                }
                Err(source) => return Err(AssetProxyError::Transport { source }),
            }
        }
    }
}
