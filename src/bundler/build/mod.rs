//! One-shot webpack build entrypoint.
pub mod executor;
pub mod queue;
pub mod request;

pub use executor::{
    run_build, runtime_error_to_report, validation_error_to_report, BundleBuildResponse,
};
pub use queue::{BundlerJobQueue, JobTicket};
pub use request::{
    BuildRequestValidationError, BundleBuildRequest, ALLOWED_ENV_OVERRIDES, ALLOWED_EXTRA_ARGS,
};
