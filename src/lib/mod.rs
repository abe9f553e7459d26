//! Shared library modules providing error types, file utilities, and telemetry initialization.

pub mod errors;
pub mod fs;
pub mod paths;
pub mod telemetry;
pub mod webpack;
