//! Log output for native hosts
//!
//! The browser build installs its own console writer; this module covers the
//! tokio supervisor and tests.

pub mod config;
pub mod init;

pub use config::InstrumentationConfig;
pub use init::init_tracing;
