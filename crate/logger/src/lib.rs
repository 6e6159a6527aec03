//! Logging facade for the Luna sample binaries.
//!
//! Library crates log through the re-exported `tracing` macros; binaries call
//! [`log_init`] once at start-up.

pub use log_utils::log_init;
pub use tracing::{debug, error, info, trace, warn};

mod log_utils;
