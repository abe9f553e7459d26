//! Library crate root re-exporting bundler, CLI, and server modules.

#[path = "lib/mod.rs"]
pub mod lib_mod;
pub use lib_mod as lib;
pub mod bundler;
pub mod cli;
pub mod server;
