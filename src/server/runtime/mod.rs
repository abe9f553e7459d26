//! Sidecar HTTP runtime: startup sequence and route handlers.
mod router;
mod startup;

pub use router::{build_router, SidecarState};
pub use startup::{run_server, RuntimeExit};
