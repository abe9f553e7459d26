use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;

use webpack_sidecar::bundler::DevServer;

use crate::common::{scratch_project, set_mock_behavior, test_sidecar_config};

#[tokio::test]
async fn start_status_stop_round_trip() -> Result<()> {
    let temp = scratch_project()?;
    let config = test_sidecar_config(39381, 3);
    let supervisor = DevServer::new(&config, temp.path().to_path_buf());

    supervisor.start().await?;
    sleep(Duration::from_millis(200)).await;

    let status = supervisor.status().await;
    assert!(status.running, "dev server should be running");
    assert!(status.pid.is_some(), "a running dev server has a pid");
    assert_eq!(status.port, 39381);

    supervisor.stop().await?;

    let status = supervisor.status().await;
    assert!(!status.running, "dev server should be stopped");
    assert!(status.pid.is_none());
    Ok(())
}

#[tokio::test]
async fn second_start_reports_already_running() -> Result<()> {
    let temp = scratch_project()?;
    let config = test_sidecar_config(39382, 3);
    let supervisor = DevServer::new(&config, temp.path().to_path_buf());

    supervisor.start().await?;
    sleep(Duration::from_millis(200)).await;

    let error = supervisor
        .start()
        .await
        .expect_err("second start should fail");
    assert_eq!(error.to_string(), "process is already running");

    supervisor.stop().await?;
    Ok(())
}

#[tokio::test]
async fn wait_reaps_a_dev_server_that_exits_on_its_own() -> Result<()> {
    let temp = scratch_project()?;
    set_mock_behavior(&temp, "exit")?;
    let config = test_sidecar_config(39383, 3);
    let supervisor = DevServer::new(&config, temp.path().to_path_buf());

    supervisor.start().await?;
    let exit_status = supervisor.wait().await?;

    assert!(exit_status.success(), "mock dev server exits cleanly");
    let status = supervisor.status().await;
    assert!(!status.running, "wait should leave the supervisor idle");
    Ok(())
}

#[tokio::test]
async fn restart_replaces_an_exited_dev_server() -> Result<()> {
    let temp = scratch_project()?;
    set_mock_behavior(&temp, "exit")?;
    let config = test_sidecar_config(39384, 3);
    let supervisor = DevServer::new(&config, temp.path().to_path_buf());

    supervisor.start().await?;
    sleep(Duration::from_millis(300)).await;

    supervisor
        .start()
        .await
        .expect("start should replace a dev server that already exited");
    supervisor.wait().await?;
    Ok(())
}
