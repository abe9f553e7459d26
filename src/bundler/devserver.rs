//! Lifecycle supervision for the webpack dev server child process.

use std::{path::PathBuf, process::ExitStatus, process::Stdio, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Child,
    sync::Mutex,
};
use tracing::{info, warn};

use crate::{
    bundler::record::Mode,
    lib::{errors::DevServerError, webpack as webpack_helpers},
    server::config::SidecarConfig,
};

/// Snapshot of the supervised process, reported by the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevServerStatus {
    pub running: bool,
    pub pid: Option<u32>,
    pub port: u16,
}

/// Owns the `webpack serve` child and serializes lifecycle transitions.
///
/// Cloning shares the same child slot, so the HTTP state and the shutdown
/// path operate on one process.
#[derive(Clone)]
pub struct DevServer {
    inner: Arc<DevServerInner>,
}

struct DevServerInner {
    bin_path: Option<PathBuf>,
    project_root: PathBuf,
    port: u16,
    child: Mutex<Option<Child>>,
}

impl DevServer {
    pub fn new(config: &SidecarConfig, project_root: PathBuf) -> Self {
        let bin_path =
            webpack_helpers::resolve_bin_path(config.devserver.bin.as_deref(), &project_root);
        Self {
            inner: Arc::new(DevServerInner {
                bin_path,
                project_root,
                port: config.devserver.port,
                child: Mutex::new(None),
            }),
        }
    }

    pub fn port(&self) -> u16 {
        self.inner.port
    }

    /// Spawn `webpack serve` under the project root.
    ///
    /// A slot already holding a live process is an error; a process that has
    /// exited since the last transition is reaped and replaced.
    pub async fn start(&self) -> Result<(), DevServerError> {
        let mut slot = self.inner.child.lock().await;
        if let Some(child) = slot.as_mut() {
            match child.try_wait() {
                Ok(Some(status)) => {
                    info!(
                        target: "webpack_sidecar::devserver",
                        status = %status,
                        "Previous dev server exited; starting a new one"
                    );
                }
                Ok(None) => return Err(DevServerError::AlreadyRunning),
                Err(source) => return Err(DevServerError::Wait { source }),
            }
        }

        let mut command = webpack_helpers::build_webpack_serve_command(
            webpack_helpers::WebpackCommandConfig {
                bin_path: self.inner.bin_path.as_deref(),
                project_root: &self.inner.project_root,
                node_env: Mode::Development.node_env(),
            },
            webpack_helpers::WebpackServeRequest {
                port: self.inner.port,
            },
        );
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|source| DevServerError::Spawn { source })?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(stream_child_lines(stdout, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(stream_child_lines(stderr, "stderr"));
        }

        info!(
            target: "webpack_sidecar::devserver",
            port = self.inner.port,
            pid = child.id(),
            root = %self.inner.project_root.display(),
            "Started webpack dev server"
        );
        *slot = Some(child);
        Ok(())
    }

    /// Block until the dev server exits on its own.
    ///
    /// Takes the child out of the slot, so a concurrent `stop` sees the
    /// process as already gone.
    pub async fn wait(&self) -> Result<ExitStatus, DevServerError> {
        let child = self.inner.child.lock().await.take();
        let mut child = child.ok_or(DevServerError::NotRunning)?;
        child
            .wait()
            .await
            .map_err(|source| DevServerError::Wait { source })
    }

    /// Interrupt the dev server and reap it.
    ///
    /// SIGINT lets webpack-dev-server close its socket before exiting.
    pub async fn stop(&self) -> Result<(), DevServerError> {
        let child = self.inner.child.lock().await.take();
        let mut child = child.ok_or(DevServerError::NotStarted)?;

        if let Some(pid) = child.id() {
            let result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGINT) };
            if result != 0 {
                return Err(DevServerError::Interrupt {
                    source: std::io::Error::last_os_error(),
                });
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|source| DevServerError::Wait { source })?;
        info!(
            target: "webpack_sidecar::devserver",
            status = %status,
            "Stopped webpack dev server"
        );
        Ok(())
    }

    /// Report whether the child is still alive, reaping it if it exited.
    pub async fn status(&self) -> DevServerStatus {
        let mut slot = self.inner.child.lock().await;
        let mut running = false;
        let mut pid = None;
        if let Some(child) = slot.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                running = true;
                pid = child.id();
            }
        }
        if !running {
            *slot = None;
        }
        DevServerStatus {
            running,
            pid,
            port: self.inner.port,
        }
    }
}

async fn stream_child_lines<R>(reader: R, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                info!(target: "webpack_sidecar::devserver", stream, "{line}");
            }
            Ok(None) => break,
            Err(err) => {
                warn!(
                    target: "webpack_sidecar::devserver",
                    stream,
                    error = %err,
                    "Failed to read dev server output"
                );
                break;
            }
        }
    }
}
