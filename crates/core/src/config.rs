//! Session timing configuration

use crate::validation::{validators, ValidateConfig};
use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Total allowed inactivity before a forced logout.
///
/// This is the only place the idle budget is defined; every consumer reads it
/// through [`SessionConfig`].
pub const DEFAULT_IDLE_BUDGET: Duration = Duration::from_secs(30 * 60);

/// Portion of the idle budget reserved for the visible countdown
pub const DEFAULT_WARNING_LEAD: Duration = Duration::from_secs(60);

/// Value the countdown starts from when the warning opens
pub const DEFAULT_COUNTDOWN_START: u32 = 60;

/// Countdown decrement period
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// How often the backend profile is re-checked while authenticated
pub const DEFAULT_REVALIDATION_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Longest wait for the identity provider to acknowledge a sign-out
pub const DEFAULT_SIGN_OUT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable prefix for overrides, e.g. `TABLEBOOK__IDLE_BUDGET_SECS`
pub const ENV_PREFIX: &str = "TABLEBOOK";

/// Session timing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle budget in seconds
    #[serde(default = "default_idle_budget_secs")]
    pub idle_budget_secs: u64,
    /// Warning lead time in seconds
    #[serde(default = "default_warning_lead_secs")]
    pub warning_lead_secs: u64,
    /// Countdown start value
    #[serde(default = "default_countdown_start")]
    pub countdown_start: u32,
    /// Countdown tick period in milliseconds
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
    /// Profile re-validation interval in seconds
    #[serde(default = "default_revalidation_interval_secs")]
    pub revalidation_interval_secs: u64,
    /// Sign-out acknowledgement timeout in seconds
    #[serde(default = "default_sign_out_timeout_secs")]
    pub sign_out_timeout_secs: u64,
}

fn default_idle_budget_secs() -> u64 {
    DEFAULT_IDLE_BUDGET.as_secs()
}

fn default_warning_lead_secs() -> u64 {
    DEFAULT_WARNING_LEAD.as_secs()
}

fn default_countdown_start() -> u32 {
    DEFAULT_COUNTDOWN_START
}

fn default_tick_period_ms() -> u64 {
    DEFAULT_TICK_PERIOD.as_millis() as u64
}

fn default_revalidation_interval_secs() -> u64 {
    DEFAULT_REVALIDATION_INTERVAL.as_secs()
}

fn default_sign_out_timeout_secs() -> u64 {
    DEFAULT_SIGN_OUT_TIMEOUT.as_secs()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_budget_secs: default_idle_budget_secs(),
            warning_lead_secs: default_warning_lead_secs(),
            countdown_start: default_countdown_start(),
            tick_period_ms: default_tick_period_ms(),
            revalidation_interval_secs: default_revalidation_interval_secs(),
            sign_out_timeout_secs: default_sign_out_timeout_secs(),
        }
    }
}

impl SessionConfig {
    /// Build a config from explicit durations, validating the result
    pub fn new(
        idle_budget: Duration,
        warning_lead: Duration,
        countdown_start: u32,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            idle_budget_secs: idle_budget.as_secs(),
            warning_lead_secs: warning_lead.as_secs(),
            countdown_start,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Override the re-validation interval
    #[must_use]
    pub fn with_revalidation_interval(mut self, interval: Duration) -> Self {
        self.revalidation_interval_secs = interval.as_secs();
        self
    }

    /// Override the countdown tick period
    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period_ms = period.as_millis() as u64;
        self
    }

    pub fn idle_budget(&self) -> Duration {
        Duration::from_secs(self.idle_budget_secs)
    }

    pub fn warning_lead(&self) -> Duration {
        Duration::from_secs(self.warning_lead_secs)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn revalidation_interval(&self) -> Duration {
        Duration::from_secs(self.revalidation_interval_secs)
    }

    pub fn sign_out_timeout(&self) -> Duration {
        Duration::from_secs(self.sign_out_timeout_secs)
    }

    /// Idle time after which the warning opens
    pub fn warning_delay(&self) -> Duration {
        self.idle_budget().saturating_sub(self.warning_lead())
    }

    /// Load configuration from the default locations and the environment
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(
            &["tablebook.toml", "config/tablebook.toml"],
            false,
            environment(),
        )
    }

    /// Load configuration from a specific file, with environment overrides
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        Self::from_sources(&[path], true, environment())
    }

    /// Defaults, then each file in order, then the environment; validated
    #[cfg(not(target_arch = "wasm32"))]
    fn from_sources(
        paths: &[&str],
        required: bool,
        env: config::Environment,
    ) -> Result<Self, ConfigError> {
        use config::{Config, File};

        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        for path in paths {
            builder = builder.add_source(File::with_name(path).required(required));
        }

        let config: Self = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

/// `TABLEBOOK__*` overrides, e.g. `TABLEBOOK__IDLE_BUDGET_SECS=900`
#[cfg(not(target_arch = "wasm32"))]
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

impl ValidateConfig for SessionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        validators::validate_nonzero(self.idle_budget_secs, "idle_budget_secs")?;
        validators::validate_less_than(
            self.warning_lead_secs,
            self.idle_budget_secs,
            "warning_lead_secs",
            "idle_budget_secs",
        )?;
        validators::validate_nonzero(u64::from(self.countdown_start), "countdown_start")?;
        validators::validate_nonzero(self.tick_period_ms, "tick_period_ms")?;
        validators::validate_nonzero(
            self.revalidation_interval_secs,
            "revalidation_interval_secs",
        )?;
        validators::validate_nonzero(self.sign_out_timeout_secs, "sign_out_timeout_secs")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.idle_budget(), Duration::from_secs(1800));
        assert_eq!(config.warning_lead(), Duration::from_secs(60));
        assert_eq!(config.warning_delay(), Duration::from_secs(1740));
        assert_eq!(config.countdown_start, 60);
        assert_eq!(config.tick_period(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scaled_config() {
        let config =
            SessionConfig::new(Duration::from_secs(10), Duration::from_secs(4), 3).unwrap();
        assert_eq!(config.warning_delay(), Duration::from_secs(6));
        assert_eq!(config.countdown_start, 3);
    }

    #[test]
    fn test_rejects_lead_not_below_budget() {
        let result = SessionConfig::new(Duration::from_secs(60), Duration::from_secs(60), 10);
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("warning_lead_secs"));
    }

    #[test]
    fn test_rejects_zero_countdown() {
        let result = SessionConfig::new(Duration::from_secs(60), Duration::from_secs(10), 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_zero_tick_and_revalidation() {
        let config = SessionConfig::default().with_tick_period(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = SessionConfig::default().with_revalidation_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_uses_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"idle_budget_secs": 600}"#).unwrap();
        assert_eq!(config.idle_budget_secs, 600);
        assert_eq!(config.warning_lead_secs, 60);
        assert_eq!(config.countdown_start, 60);
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("tablebook-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("session.toml");
        std::fs::write(
            &path,
            "idle_budget_secs = 120\nwarning_lead_secs = 20\ncountdown_start = 20\n",
        )
        .unwrap();

        let config = SessionConfig::load_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.idle_budget(), Duration::from_secs(120));
        assert_eq!(config.warning_delay(), Duration::from_secs(100));
        assert_eq!(config.countdown_start, 20);

        std::fs::remove_dir_all(&dir).ok();
    }

    fn env_overrides(pairs: &[(&str, &str)]) -> config::Environment {
        let vars: config::Map<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        environment().source(Some(vars))
    }

    #[test]
    fn test_env_overrides_file_and_defaults() {
        let dir = std::env::temp_dir().join(format!("tablebook-env-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("session.toml");
        std::fs::write(&path, "idle_budget_secs = 120\nwarning_lead_secs = 20\n").unwrap();
        let path = path.to_str().unwrap();

        let config = SessionConfig::from_sources(
            &[path],
            true,
            env_overrides(&[("TABLEBOOK__IDLE_BUDGET_SECS", "300")]),
        )
        .unwrap();
        assert_eq!(config.idle_budget(), Duration::from_secs(300));
        assert_eq!(config.warning_lead(), Duration::from_secs(20));
        assert_eq!(config.countdown_start, DEFAULT_COUNTDOWN_START);

        let result = SessionConfig::from_sources(
            &[path],
            true,
            env_overrides(&[("TABLEBOOK__WARNING_LEAD_SECS", "120")]),
        );
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("warning_lead_secs"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_optional_files_fall_back_to_defaults() {
        let config = SessionConfig::from_sources(
            &["does-not-exist/tablebook.toml"],
            false,
            env_overrides(&[("TABLEBOOK__SIGN_OUT_TIMEOUT_SECS", "3")]),
        )
        .unwrap();
        assert_eq!(config.idle_budget(), DEFAULT_IDLE_BUDGET);
        assert_eq!(config.sign_out_timeout(), Duration::from_secs(3));
    }
}
