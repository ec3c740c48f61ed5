//! Warden Core - shared foundation for the Warden back-office service
//!
//! This crate defines the error taxonomy, process-wide settings, and logging
//! initialization used by the rest of the workspace.

pub mod error;
pub mod logging;
pub mod settings;

pub use error::*;
pub use logging::*;
pub use settings::*;

// Re-export commonly used external types
pub use tracing;
