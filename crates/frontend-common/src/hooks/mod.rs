//! Custom hooks for the application

pub mod use_activity_monitor;

pub use use_activity_monitor::use_activity_monitor;
