//! Configuration validation support

use config::ConfigError;
use serde::{Deserialize, Serialize};

/// Trait for validating configuration values
pub trait ValidateConfig: Serialize + for<'de> Deserialize<'de> {
    /// Validate the configuration
    ///
    /// Returns Ok(()) if valid, or an error describing what's wrong
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Common validation helpers
pub mod validators {
    use config::ConfigError;

    /// Validate that a value is not zero
    pub fn validate_nonzero(value: u64, field: &str) -> Result<(), ConfigError> {
        if value == 0 {
            return Err(ConfigError::Message(format!("{field}: must be greater than 0")));
        }
        Ok(())
    }

    /// Validate that `lower` is strictly below `upper`
    pub fn validate_less_than(
        lower: u64,
        upper: u64,
        lower_field: &str,
        upper_field: &str,
    ) -> Result<(), ConfigError> {
        if lower >= upper {
            return Err(ConfigError::Message(format!(
                "{lower_field}: must be less than {upper_field} ({lower} >= {upper})"
            )));
        }
        Ok(())
    }
}
