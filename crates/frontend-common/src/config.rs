//! Frontend configuration

use tablebook_core::SessionConfig;

/// Authentication configuration
pub struct AuthConfig;

impl AuthConfig {
    /// Session storage key for the signed-in user
    pub const AUTH_STATE_KEY: &'static str = "auth_state";

    /// Prefix of every backend route
    pub const API_PREFIX: &'static str = "/api";

    /// Identity provider routes
    pub const SIGN_IN_PATH: &'static str = "/auth/sign-in";
    pub const SIGN_OUT_PATH: &'static str = "/auth/sign-out";
    pub const REFRESH_PATH: &'static str = "/auth/refresh";

    /// Credential refresh interval in milliseconds
    pub const TOKEN_REFRESH_INTERVAL_MS: u32 = 50 * 60_000;

    /// How long a forced-logout notice stays on screen
    pub const NOTICE_DISMISS_MS: u32 = 8_000;

    /// Idle-logout timings shared by the monitor and the re-validation poll
    pub fn session() -> SessionConfig {
        SessionConfig::default()
    }
}

/// Convert a duration to the millisecond delay gloo timers take
pub(crate) fn timer_millis(duration: std::time::Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}
