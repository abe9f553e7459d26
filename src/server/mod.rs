//! Configuration loading and the HTTP runtime.

pub mod config;
pub mod runtime;
