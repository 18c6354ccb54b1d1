//! # Execution Context
//!
//! Per-test context handed explicitly to whatever needs it (diagnostics
//! directories, spans), and the suite fixture accessor.

use crate::clock::Clock;
use crate::cluster::{ClusterQuery, Provisioner};
use crate::config::HarnessConfig;
use crate::lifecycle::OperatorLifecycleController;
use std::path::PathBuf;
use tracing::{info_span, Span};

/// Identity of the running test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub test_class: String,
    pub test_method: String,
    pub logs_dir: PathBuf,
    pub collect_test_data: bool,
}

impl ExecutionContext {
    pub fn new(
        test_class: impl Into<String>,
        test_method: impl Into<String>,
        config: &HarnessConfig,
    ) -> Self {
        Self {
            test_class: test_class.into(),
            test_method: test_method.into(),
            logs_dir: config.logs_dir.clone(),
            collect_test_data: config.collect_test_data,
        }
    }

    /// `<logs_dir>/<test_class>/<test_method>`
    #[must_use]
    pub fn artifact_dir(&self) -> PathBuf {
        self.logs_dir.join(&self.test_class).join(&self.test_method)
    }

    /// Creates the artifact directory when test data collection is enabled
    ///
    /// Returns `None` when collection is switched off.
    pub fn prepare_artifact_dir(&self) -> std::io::Result<Option<PathBuf>> {
        if !self.collect_test_data {
            return Ok(None);
        }
        let dir = self.artifact_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(Some(dir))
    }

    /// Span that tags every log line of the test
    #[must_use]
    pub fn span(&self) -> Span {
        info_span!("test", class = %self.test_class, method = %self.test_method)
    }
}

/// Suite-level fixtures a test needs to reach
///
/// Suites implement this on their fixture struct instead of looking up a
/// shared operator field at runtime.
pub trait SuiteFixture {
    type Provisioner: Provisioner;
    type Query: ClusterQuery;
    type Clock: Clock;

    /// Namespace the suite deploys into
    fn namespace(&self) -> &str;

    fn operator(&self) -> &OperatorLifecycleController<Self::Provisioner, Self::Query, Self::Clock>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_dir() {
        let config = HarnessConfig {
            logs_dir: PathBuf::from("/tmp/logs"),
            ..HarnessConfig::default()
        };
        let context = ExecutionContext::new(
            "BrokerConfigurationTests",
            "initialVariableSettingTest",
            &config,
        );
        assert_eq!(
            context.artifact_dir(),
            PathBuf::from("/tmp/logs/BrokerConfigurationTests/initialVariableSettingTest")
        );
        assert!(context.collect_test_data);
    }

    #[test]
    fn test_prepare_artifact_dir() {
        let logs = tempfile::tempdir().unwrap();
        let config = HarnessConfig {
            logs_dir: logs.path().to_path_buf(),
            ..HarnessConfig::default()
        };
        let context = ExecutionContext::new("PersistenceTests", "storageGrowth", &config);

        let dir = context.prepare_artifact_dir().unwrap().unwrap();
        assert!(dir.is_dir());
        assert!(dir.ends_with("PersistenceTests/storageGrowth"));

        let disabled = ExecutionContext {
            collect_test_data: false,
            ..context
        };
        assert_eq!(disabled.prepare_artifact_dir().unwrap(), None);
    }
}
