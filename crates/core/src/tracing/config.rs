//! Configuration for log output

use serde::{Deserialize, Serialize};

/// Instrumentation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Log level filter (e.g., "info", "tablebook_core=debug")
    pub log_level: String,
    /// Include the module path of each event
    #[serde(default = "default_true")]
    pub with_target: bool,
}

fn default_true() -> bool {
    true
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            service_name: "tablebook".to_string(),
            log_level: "info".to_string(),
            with_target: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InstrumentationConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.service_name, "tablebook");
        assert!(config.with_target);
    }

    #[test]
    fn test_deserialize_defaults_target() {
        let config: InstrumentationConfig =
            serde_json::from_str(r#"{"service_name": "svc", "log_level": "warn"}"#).unwrap();
        assert!(config.with_target);
    }
}
