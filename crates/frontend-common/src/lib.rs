//! Session and authentication layer for the Tablebook web client

pub mod auth;
pub mod client;
pub mod components;
pub mod config;
pub mod hooks;
pub mod services;

pub use auth::context::AuthContext;
pub use auth::{AuthProvider, SessionServices};
pub use components::{InactivityModal, LogoutNoticeToast};
pub use config::AuthConfig;
pub use hooks::use_activity_monitor;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Route `tracing` and `log` output to the browser console
pub fn init_logging() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_writer(tracing_web::MakeWebConsoleWriter::new());
    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}
