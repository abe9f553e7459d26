use anyhow::Result;
use serde_json::json;

use webpack_sidecar::bundler::{Mode, RecordSettings, WebpackConfig};

use crate::common::scratch_project;

#[test]
fn record_for_a_fresh_root_matches_the_documented_shape() -> Result<()> {
    let temp = scratch_project()?;
    let record = WebpackConfig::from_root(temp.path())?;
    let root = temp.path().canonicalize()?;

    let expected = json!({
        "mode": "development",
        "entry": "./index.js",
        "output": {
            "path": root.join("dist"),
            "filename": "app.bundle.js"
        },
        "devServer": { "port": 9381 }
    });
    assert_eq!(serde_json::to_value(&record)?, expected);
    Ok(())
}

#[test]
fn nested_project_roots_resolve_dist_in_place() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("webpack").join("test_env");
    std::fs::create_dir_all(&root)?;
    std::fs::write(root.join("index.js"), "console.log(1);\n")?;

    let record = WebpackConfig::from_root(&root)?;
    let value = serde_json::to_value(&record)?;
    let canonical = root.canonicalize()?;

    assert_eq!(value["output"]["path"], json!(canonical.join("dist")));
    assert_eq!(value["devServer"]["port"], 9381);
    Ok(())
}

#[test]
fn record_construction_is_idempotent() -> Result<()> {
    let temp = scratch_project()?;

    let first = serde_json::to_value(WebpackConfig::from_root(temp.path())?)?;
    let second = serde_json::to_value(WebpackConfig::from_root(temp.path())?)?;

    assert_eq!(first, second);
    Ok(())
}

#[test]
fn configured_settings_flow_into_the_record() -> Result<()> {
    let temp = scratch_project()?;
    let settings = RecordSettings {
        mode: Mode::Production,
        entry: "./src/main.js".into(),
        filename: "main.bundle.js".into(),
        port: 4100,
    };

    let record = WebpackConfig::from_root_with(temp.path(), &settings)?;
    let value = serde_json::to_value(&record)?;

    assert_eq!(value["mode"], "production");
    assert_eq!(value["entry"], "./src/main.js");
    assert_eq!(value["output"]["filename"], "main.bundle.js");
    assert_eq!(value["devServer"]["port"], 4100);
    Ok(())
}
