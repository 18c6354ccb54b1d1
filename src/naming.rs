//! # Name Resolution
//!
//! Resolves which of several naming candidates is the real object name.
//!
//! The operator was renamed between releases, so its Deployment is either
//! `<base>-controller-manager` (current) or `<base>-operator` (older). The
//! resolver checks the candidates in the order given (newest convention
//! first) and remembers the first one that exists. Once resolved, the name
//! never changes for the lifetime of the resolver, even if another candidate
//! starts existing later, e.g. during an in-place upgrade.

use crate::error::{HarnessError, Result};
use std::future::Future;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::info;

/// What to do when more than one candidate exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamePolicy {
    /// First existing candidate in caller order wins
    #[default]
    PreferNewest,
    /// Every candidate is checked; more than one existing is an error
    RequireUnique,
}

impl FromStr for NamePolicy {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "prefer-newest" | "newest" => Ok(NamePolicy::PreferNewest),
            "require-unique" | "unique" => Ok(NamePolicy::RequireUnique),
            other => Err(HarnessError::Configuration(format!(
                "unknown name policy '{other}'"
            ))),
        }
    }
}

/// Outcome of a resolution attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    /// No candidate exists yet; retry through the waiter
    Unresolved,
}

impl Resolution {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(name) => Some(name),
            Resolution::Unresolved => None,
        }
    }
}

/// Sticky resolver over an ordered candidate list
#[derive(Debug)]
pub struct ResourceNameResolver {
    candidates: Vec<String>,
    policy: NamePolicy,
    resolved: OnceLock<String>,
}

impl ResourceNameResolver {
    pub fn new(candidates: Vec<String>, policy: NamePolicy) -> Result<Self> {
        if candidates.is_empty() {
            return Err(HarnessError::Configuration(
                "at least one naming candidate is required".to_string(),
            ));
        }
        Ok(Self {
            candidates,
            policy,
            resolved: OnceLock::new(),
        })
    }

    #[must_use]
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    #[must_use]
    pub fn policy(&self) -> NamePolicy {
        self.policy
    }

    /// The fixed name, once a resolution succeeded
    #[must_use]
    pub fn resolved(&self) -> Option<&str> {
        self.resolved.get().map(String::as_str)
    }

    /// Resolve against `exists`, or return the cached name
    ///
    /// `exists` is not invoked at all once a name has been fixed.
    pub async fn resolve<F, Fut>(&self, mut exists: F) -> Result<Resolution>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        if let Some(name) = self.resolved.get() {
            return Ok(Resolution::Resolved(name.clone()));
        }

        let found = match self.policy {
            NamePolicy::PreferNewest => {
                let mut found = None;
                for candidate in &self.candidates {
                    if exists(candidate.clone()).await? {
                        found = Some(candidate.clone());
                        break;
                    }
                }
                found
            }
            NamePolicy::RequireUnique => {
                let mut existing = Vec::new();
                for candidate in &self.candidates {
                    if exists(candidate.clone()).await? {
                        existing.push(candidate.clone());
                    }
                }
                if existing.len() > 1 {
                    return Err(HarnessError::AmbiguousName {
                        candidates: existing,
                    });
                }
                existing.pop()
            }
        };

        match found {
            Some(name) => {
                let fixed = self.resolved.get_or_init(|| name).clone();
                info!("Resolved name '{}' from candidates {:?}", fixed, self.candidates);
                Ok(Resolution::Resolved(fixed))
            }
            None => Ok(Resolution::Unresolved),
        }
    }
}
