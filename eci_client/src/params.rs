//! # External Control Interface Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for an [`crate::EciSession`].
///
/// Loadable from a toml file via `util::params::load`; every field except the interface name
/// has a deployment default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EciParams {
    /// Name of the interface, used in log output (example: "dual_arm_a1")
    pub interface_name: String,

    /// Path of the tab-separated feedback log written by the receiver
    #[serde(default = "default_feedback_log_path")]
    pub feedback_log_path: PathBuf,

    /// Receiver poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Total budget for receiver shutdown confirmation in milliseconds
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for EciParams {
    fn default() -> Self {
        Self {
            interface_name: "dual_arm_eci".into(),
            feedback_log_path: default_feedback_log_path(),
            poll_interval_ms: default_poll_interval_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_feedback_log_path() -> PathBuf {
    PathBuf::from("eci_feedback_log.txt")
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_shutdown_timeout_ms() -> u64 {
    1000
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_toml() {
        let params: EciParams = toml::from_str("interface_name = \"dual_arm_a1\"").unwrap();

        assert_eq!(params.interface_name, "dual_arm_a1");
        assert_eq!(params.feedback_log_path, default_feedback_log_path());
        assert_eq!(params.poll_interval_ms, 10);
        assert_eq!(params.shutdown_timeout_ms, 1000);
    }
}
