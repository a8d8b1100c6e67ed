//! Engine runtime configuration.
//!
//! Configuration is resolved once at startup and passed into the form
//! session. Nothing in the engine reads process-wide environment variables
//! during editing, which keeps behaviour consistent across embedding shells
//! and test harnesses.

use crate::{FormError, FormResult};
use std::time::Duration;

/// Default quiet period before an accumulated batch of edits is autosaved.
pub const DEFAULT_AUTOSAVE_DEBOUNCE: Duration = Duration::from_secs(1);

/// Engine configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    autosave_debounce: Duration,
}

impl EngineConfig {
    /// Create a new `EngineConfig`.
    ///
    /// # Errors
    ///
    /// Returns `FormError::InvalidInput` if the debounce interval is zero;
    /// a zero quiet period would turn every keystroke into a patch request.
    pub fn new(autosave_debounce: Duration) -> FormResult<Self> {
        if autosave_debounce.is_zero() {
            return Err(FormError::InvalidInput(
                "autosave debounce must be greater than zero".into(),
            ));
        }
        Ok(Self { autosave_debounce })
    }

    pub fn autosave_debounce(&self) -> Duration {
        self.autosave_debounce
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autosave_debounce: DEFAULT_AUTOSAVE_DEBOUNCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_rejects_zero_debounce() {
        let err = EngineConfig::new(Duration::ZERO).expect_err("should reject zero");
        assert!(matches!(err, FormError::InvalidInput(msg) if msg.contains("debounce")));
    }

    #[test]
    fn test_engine_config_default_is_one_second() {
        assert_eq!(
            EngineConfig::default().autosave_debounce(),
            Duration::from_secs(1)
        );
    }
}
