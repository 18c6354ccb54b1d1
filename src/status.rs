//! # Status Conditions
//!
//! Pure matching of a status-condition query against an observed condition
//! list. Nothing here talks to the cluster; callers fetch a fresh list on
//! every poll and hand it in.
//!
//! ## Authoritative condition
//!
//! A list may carry several entries of the same type. Only the entry with
//! the latest `lastTransitionTime` counts; ties (including entries without a
//! timestamp) go to the entry that appears later in the list.

use crate::error::HarnessError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tri-state condition status, compared exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed status condition
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub last_transition_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

impl StatusCondition {
    pub fn new(type_: impl Into<String>, status: ConditionStatus) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: None,
            message: None,
            last_transition_time: None,
            observed_generation: None,
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_transition_time(mut self, time: DateTime<Utc>) -> Self {
        self.last_transition_time = Some(time);
        self
    }

    #[must_use]
    pub fn with_observed_generation(mut self, generation: i64) -> Self {
        self.observed_generation = Some(generation);
        self
    }
}

impl fmt::Display for StatusCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.type_, self.status)?;
        if let Some(reason) = &self.reason {
            write!(f, " ({reason})")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

/// Condition query; `None` fields are wildcards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionQuery {
    pub condition_type: String,
    pub status: ConditionStatus,
    pub reason: Option<String>,
    pub message_contains: Option<String>,
}

impl ConditionQuery {
    pub fn new(condition_type: impl Into<String>, status: ConditionStatus) -> Self {
        Self {
            condition_type: condition_type.into(),
            status,
            reason: None,
            message_contains: None,
        }
    }

    /// `<type>=True`
    pub fn is_true(condition_type: impl Into<String>) -> Self {
        Self::new(condition_type, ConditionStatus::True)
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn with_message_containing(mut self, fragment: impl Into<String>) -> Self {
        self.message_contains = Some(fragment.into());
        self
    }

    fn accepts(&self, condition: &StatusCondition) -> bool {
        if condition.status != self.status {
            return false;
        }
        if let Some(reason) = &self.reason {
            if condition.reason.as_deref() != Some(reason.as_str()) {
                return false;
            }
        }
        if let Some(fragment) = &self.message_contains {
            let message = condition.message.as_deref().unwrap_or_default();
            if !message.contains(fragment.as_str()) {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for ConditionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.condition_type, self.status)?;
        if let Some(reason) = &self.reason {
            write!(f, " ({reason})")?;
        }
        if let Some(fragment) = &self.message_contains {
            write!(f, " with message containing {fragment:?}")?;
        }
        Ok(())
    }
}

/// Outcome of evaluating a query against a condition list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionMatch<'a> {
    Matched(&'a StatusCondition),
    Mismatch(&'a StatusCondition),
    Absent,
}

/// The authoritative condition of `condition_type`, if any
pub fn authoritative<'a>(
    conditions: &'a [StatusCondition],
    condition_type: &str,
) -> Option<&'a StatusCondition> {
    // max_by keeps the last of equal elements, which gives later positions the tie
    conditions
        .iter()
        .filter(|c| c.type_ == condition_type)
        .max_by(|a, b| a.last_transition_time.cmp(&b.last_transition_time))
}

pub fn evaluate<'a>(conditions: &'a [StatusCondition], query: &ConditionQuery) -> ConditionMatch<'a> {
    match authoritative(conditions, &query.condition_type) {
        None => ConditionMatch::Absent,
        Some(condition) if query.accepts(condition) => ConditionMatch::Matched(condition),
        Some(condition) => ConditionMatch::Mismatch(condition),
    }
}

/// Whether the authoritative condition of the queried type satisfies the query
pub fn matches(conditions: &[StatusCondition], query: &ConditionQuery) -> bool {
    matches!(evaluate(conditions, query), ConditionMatch::Matched(_))
}

/// Single-shot strict check
///
/// A present but different condition is a [`HarnessError::StatusMismatch`];
/// an absent one is reported the same way with `observed` set to `absent`.
pub fn expect(conditions: &[StatusCondition], query: &ConditionQuery) -> Result<(), HarnessError> {
    match evaluate(conditions, query) {
        ConditionMatch::Matched(_) => Ok(()),
        ConditionMatch::Mismatch(observed) => Err(HarnessError::StatusMismatch {
            condition_type: query.condition_type.clone(),
            expected: query.to_string(),
            observed: observed.to_string(),
        }),
        ConditionMatch::Absent => Err(HarnessError::StatusMismatch {
            condition_type: query.condition_type.clone(),
            expected: query.to_string(),
            observed: "absent".to_string(),
        }),
    }
}

/// Compact rendering of a condition list for wait diagnostics
pub fn summarize(conditions: &[StatusCondition]) -> String {
    if conditions.is_empty() {
        return "no conditions".to_string();
    }
    conditions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_absent_type_is_not_a_match() {
        let conditions = vec![StatusCondition::new("Deployed", ConditionStatus::True)];
        assert!(!matches(&conditions, &ConditionQuery::is_true("Ready")));
        assert_eq!(
            evaluate(&conditions, &ConditionQuery::is_true("Ready")),
            ConditionMatch::Absent
        );
    }

    #[test]
    fn test_ready_false_ignores_unrelated_true_conditions() {
        let conditions = vec![
            StatusCondition::new("Deployed", ConditionStatus::True),
            StatusCondition::new("Valid", ConditionStatus::True),
            StatusCondition::new("Ready", ConditionStatus::False),
        ];
        assert!(!matches(&conditions, &ConditionQuery::is_true("Ready")));
    }

    #[test]
    fn test_latest_transition_time_is_authoritative() {
        let conditions = vec![
            StatusCondition::new("Ready", ConditionStatus::True).with_transition_time(at(30)),
            StatusCondition::new("Ready", ConditionStatus::False).with_transition_time(at(10)),
        ];
        assert!(matches(&conditions, &ConditionQuery::is_true("Ready")));
    }

    #[test]
    fn test_equal_transition_times_prefer_later_position() {
        let conditions = vec![
            StatusCondition::new("Ready", ConditionStatus::True).with_transition_time(at(10)),
            StatusCondition::new("Ready", ConditionStatus::False).with_transition_time(at(10)),
        ];
        assert!(!matches(&conditions, &ConditionQuery::is_true("Ready")));

        let untimed = vec![
            StatusCondition::new("Ready", ConditionStatus::False),
            StatusCondition::new("Ready", ConditionStatus::True),
        ];
        assert!(matches(&untimed, &ConditionQuery::is_true("Ready")));
    }

    #[test]
    fn test_status_is_compared_exactly() {
        let conditions = vec![StatusCondition::new("Ready", ConditionStatus::Unknown)];
        assert!(!matches(&conditions, &ConditionQuery::is_true("Ready")));
        assert!(!matches(
            &conditions,
            &ConditionQuery::new("Ready", ConditionStatus::False)
        ));
        assert!(matches(
            &conditions,
            &ConditionQuery::new("Ready", ConditionStatus::Unknown)
        ));
    }

    #[test]
    fn test_optional_fields_are_anded() {
        let conditions = vec![StatusCondition::new("Deployed", ConditionStatus::False)
            .with_reason("ResourceError")
            .with_message("metadata.labels: must be no more than 63 characters")];

        let base = ConditionQuery::new("Deployed", ConditionStatus::False);
        assert!(matches(&conditions, &base));
        assert!(matches(&conditions, &base.clone().with_reason("ResourceError")));
        assert!(matches(
            &conditions,
            &base
                .clone()
                .with_reason("ResourceError")
                .with_message_containing("no more than 63 characters")
        ));
        assert!(!matches(&conditions, &base.clone().with_reason("Other")));
        assert!(!matches(
            &conditions,
            &base.with_reason("ResourceError").with_message_containing("quota")
        ));
    }

    #[test]
    fn test_expect_reports_mismatch() {
        let conditions = vec![StatusCondition::new("Ready", ConditionStatus::False)
            .with_reason("WaitingForAllConditions")];
        let err = expect(&conditions, &ConditionQuery::is_true("Ready")).unwrap_err();
        match err {
            HarnessError::StatusMismatch {
                condition_type,
                observed,
                ..
            } => {
                assert_eq!(condition_type, "Ready");
                assert!(observed.contains("WaitingForAllConditions"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_deserializes_kubernetes_condition() {
        let json = serde_json::json!({
            "type": "Ready",
            "status": "True",
            "reason": "Ready",
            "message": "",
            "lastTransitionTime": "2024-05-01T10:00:00Z",
            "observedGeneration": 3
        });
        let condition: StatusCondition = serde_json::from_value(json).unwrap();
        assert_eq!(condition.status, ConditionStatus::True);
        assert_eq!(condition.observed_generation, Some(3));
        assert!(condition.last_transition_time.is_some());
    }

    #[test]
    fn test_unrecognised_status_is_rejected() {
        let json = serde_json::json!({"type": "Ready", "status": "true"});
        assert!(serde_json::from_value::<StatusCondition>(json).is_err());
    }
}
