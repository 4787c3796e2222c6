//! AgencyDesk Core - shared infrastructure
//!
//! Error taxonomy, logging bootstrap and configuration used by every other
//! agencydesk crate.

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
pub use logging::*;

// Re-export commonly used external types
pub use tracing;
