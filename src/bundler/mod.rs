//! Webpack-facing components: the configuration record, the dev-server
//! supervisor, the asset proxy, one-shot builds, and toolchain diagnosis.

pub mod build;
pub mod devserver;
pub mod doctor;
pub mod history;
pub mod proxy;
pub mod record;

pub use build::{
    run_build, runtime_error_to_report, validation_error_to_report, BundleBuildRequest,
    BundleBuildResponse, BundlerJobQueue,
};
pub use devserver::{DevServer, DevServerStatus};
pub use doctor::{
    diagnose_toolchain, diagnose_toolchain_with_probe, EnvToolchainProbe, SystemToolchainProbe,
    ToolchainProbe, ToolchainReport,
};
pub use history::{
    lookup_error_to_report, lookup_job, BuildHistory, BuildJobRecord, BuildJobStatus, JobReport,
};
pub use proxy::{AssetPayload, AssetProxy};
pub use record::{Mode, OutputSettings, RecordSettings, WebpackConfig};
