//! Configuration for claim flow runs.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{ClaimError, Result, constants};

/// Timing and buffering knobs shared by holder and issuer flows.
///
/// Missing fields in a config file fall back to the defaults in
/// [`constants`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// How long a flow waits for the counterparty's next message.
    pub session_timeout_ms: u64,
    /// How long the issuer waits on the notary, and the holder on the
    /// finalized transaction once it has countersigned.
    pub finality_timeout_ms: u64,
    /// Frames buffered per session direction.
    pub channel_capacity: usize,
    /// Issuer outcomes a responder buffers for its handle.
    pub outcome_capacity: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            session_timeout_ms: constants::DEFAULT_SESSION_TIMEOUT_MS,
            finality_timeout_ms: constants::DEFAULT_FINALITY_TIMEOUT_MS,
            channel_capacity: constants::DEFAULT_CHANNEL_CAPACITY,
            outcome_capacity: constants::DEFAULT_OUTCOME_CAPACITY,
        }
    }
}

impl FlowConfig {
    #[must_use]
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    #[must_use]
    pub fn finality_timeout(&self) -> Duration {
        Duration::from_millis(self.finality_timeout_ms)
    }

    /// Reject values that would make every run fail.
    pub fn validate(&self) -> Result<()> {
        if self.session_timeout_ms == 0 {
            return Err(ClaimError::Configuration(
                "session_timeout_ms must be > 0".into(),
            ));
        }
        if self.finality_timeout_ms == 0 {
            return Err(ClaimError::Configuration(
                "finality_timeout_ms must be > 0".into(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ClaimError::Configuration(
                "channel_capacity must be > 0".into(),
            ));
        }
        if self.outcome_capacity == 0 {
            return Err(ClaimError::Configuration(
                "outcome_capacity must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| ClaimError::Configuration(format!("invalid flow config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = FlowConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.session_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.finality_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.channel_capacity, 16);
        assert_eq!(cfg.outcome_capacity, 256);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg = FlowConfig::from_json_str(r#"{"session_timeout_ms": 500}"#).unwrap();
        assert_eq!(cfg.session_timeout_ms, 500);
        assert_eq!(cfg.finality_timeout_ms, constants::DEFAULT_FINALITY_TIMEOUT_MS);
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = FlowConfig::from_json_str(r#"{"finality_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(err, ClaimError::Configuration(_)));
    }

    #[test]
    fn zero_outcome_capacity_rejected() {
        let err = FlowConfig::from_json_str(r#"{"outcome_capacity": 0}"#).unwrap_err();
        assert!(matches!(err, ClaimError::Configuration(ref m) if m.contains("outcome_capacity")));
    }

    #[test]
    fn malformed_json_is_configuration_error() {
        let err = FlowConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ClaimError::Configuration(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = FlowConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ClaimError::Io(_)));
    }
}
