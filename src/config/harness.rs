//! # Harness Configuration
//!
//! Suite-level settings loaded from environment variables.

use crate::lifecycle::InstallMethod;
use crate::naming::NamePolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Harness-level configuration
///
/// All settings have defaults and can be overridden via environment variables,
/// which is how CI jobs tune deadlines for slower clusters.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Interval between two evaluations of any wait predicate (seconds)
    pub poll_interval_secs: u64,
    /// Deadline of each operator deployment stage, and of undeploy (seconds)
    pub operator_timeout_secs: u64,
    /// Default readiness deadline after create (seconds)
    pub resource_ready_timeout_secs: u64,
    /// Default readiness deadline after update (seconds)
    pub resource_update_timeout_secs: u64,
    /// Default deadline for a deleted resource to disappear (seconds)
    pub resource_delete_timeout_secs: u64,
    /// Product prefix of the operator Deployment name
    pub operator_base_name: String,
    pub operator_install_method: InstallMethod,
    /// Tie-break when both operator naming generations exist
    pub operator_name_policy: NamePolicy,
    /// Root directory for per-test diagnostics
    pub logs_dir: PathBuf,
    /// Keep diagnostics of failed tests
    pub collect_test_data: bool,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            operator_timeout_secs: DEFAULT_OPERATOR_TIMEOUT_SECS,
            resource_ready_timeout_secs: DEFAULT_RESOURCE_READY_TIMEOUT_SECS,
            resource_update_timeout_secs: DEFAULT_RESOURCE_UPDATE_TIMEOUT_SECS,
            resource_delete_timeout_secs: DEFAULT_RESOURCE_DELETE_TIMEOUT_SECS,
            operator_base_name: DEFAULT_OPERATOR_BASE_NAME.to_string(),
            operator_install_method: InstallMethod::ManifestFile,
            operator_name_policy: NamePolicy::PreferNewest,
            logs_dir: PathBuf::from("test-logs"),
            collect_test_data: true,
            log_level: "INFO".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            poll_interval_secs: env_var_or_default(
                "POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            ),
            operator_timeout_secs: env_var_or_default(
                "OPERATOR_TIMEOUT_SECS",
                DEFAULT_OPERATOR_TIMEOUT_SECS,
            ),
            resource_ready_timeout_secs: env_var_or_default(
                "RESOURCE_READY_TIMEOUT_SECS",
                DEFAULT_RESOURCE_READY_TIMEOUT_SECS,
            ),
            resource_update_timeout_secs: env_var_or_default(
                "RESOURCE_UPDATE_TIMEOUT_SECS",
                DEFAULT_RESOURCE_UPDATE_TIMEOUT_SECS,
            ),
            resource_delete_timeout_secs: env_var_or_default(
                "RESOURCE_DELETE_TIMEOUT_SECS",
                DEFAULT_RESOURCE_DELETE_TIMEOUT_SECS,
            ),
            operator_base_name: env_var_or_default_str(
                "OPERATOR_BASE_NAME",
                DEFAULT_OPERATOR_BASE_NAME,
            ),
            operator_install_method: env_var_or_default(
                "OPERATOR_INSTALL_METHOD",
                InstallMethod::ManifestFile,
            ),
            operator_name_policy: env_var_or_default(
                "OPERATOR_NAME_POLICY",
                NamePolicy::PreferNewest,
            ),
            logs_dir: PathBuf::from(env_var_or_default_str("LOGS_DIR", "test-logs")),
            collect_test_data: env_var_or_default_bool("COLLECT_TEST_DATA", true),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "text"),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn operator_timeout(&self) -> Duration {
        Duration::from_secs(self.operator_timeout_secs)
    }

    pub fn resource_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.resource_ready_timeout_secs)
    }

    pub fn resource_update_timeout(&self) -> Duration {
        Duration::from_secs(self.resource_update_timeout_secs)
    }

    pub fn resource_delete_timeout(&self) -> Duration {
        Duration::from_secs(self.resource_delete_timeout_secs)
    }

    /// Operator Deployment name candidates, newest convention first
    pub fn operator_name_candidates(&self) -> Vec<String> {
        use crate::constants::{OPERATOR_NEW_NAME_SUFFIX, OPERATOR_OLD_NAME_SUFFIX};
        vec![
            format!("{}{}", self.operator_base_name, OPERATOR_NEW_NAME_SUFFIX),
            format!("{}{}", self.operator_base_name, OPERATOR_OLD_NAME_SUFFIX),
        ]
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
