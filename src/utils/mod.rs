//! Utility modules: errors, metrics and logging.

pub mod error;
pub mod logging;
pub mod metrics;
