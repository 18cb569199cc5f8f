//! Condition-list helpers following the meta/v1 upsert-by-type discipline.

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};

pub const CONDITION_READY: &str = "Ready";
pub const CONDITION_OPERANDS_AVAILABLE: &str = "OperandsAvailable";
pub const CONDITION_CREATE_ONLY_MODE: &str = "CreateOnlyMode";
pub const CONDITION_UPGRADEABLE: &str = "Upgradeable";

pub const REASON_READY: &str = "Ready";
pub const REASON_IN_PROGRESS: &str = "InProgress";
pub const REASON_FAILED: &str = "Failed";
pub const REASON_RECONCILING: &str = "Reconciling";
pub const REASON_CREATE_ONLY_ENABLED: &str = "CreateOnlyModeEnabled";
pub const REASON_CREATE_ONLY_DISABLED: &str = "CreateOnlyModeDisabled";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn new_condition(
    type_: &str,
    status: ConditionStatus,
    reason: &str,
    message: impl Into<String>,
    observed_generation: Option<i64>,
) -> Condition {
    Condition {
        type_: type_.to_string(),
        status: status.as_str().to_string(),
        reason: reason.to_string(),
        message: message.into(),
        last_transition_time: Time(Utc::now()),
        observed_generation,
    }
}

pub fn find_condition<'a>(
    conditions: &'a [Condition],
    type_: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

pub fn is_condition_true(condition: &Condition) -> bool {
    condition.status.eq_ignore_ascii_case("true")
}

pub fn is_condition_false(condition: &Condition) -> bool {
    condition.status.eq_ignore_ascii_case("false")
}

/// Upsert `incoming` by type. The previous `lastTransitionTime` is kept unless
/// the status flips. Returns whether the list changed in any field other than
/// the transition time.
pub fn set_condition(
    conditions: &mut Vec<Condition>,
    mut incoming: Condition,
) -> bool {
    match conditions.iter_mut().find(|c| c.type_ == incoming.type_) {
        Some(existing) => {
            if existing.status == incoming.status {
                incoming.last_transition_time =
                    existing.last_transition_time.clone();
            }
            if *existing == incoming {
                return false;
            }
            *existing = incoming;
            true
        }
        None => {
            conditions.push(incoming);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> Time {
        Time(Utc.timestamp_opt(secs, 0).unwrap())
    }

    fn cond(type_: &str, status: &str, reason: &str, ts: i64) -> Condition {
        Condition {
            type_: type_.into(),
            status: status.into(),
            reason: reason.into(),
            message: String::new(),
            last_transition_time: at(ts),
            observed_generation: None,
        }
    }

    #[test]
    fn set_condition_appends_new_type() {
        let mut list = vec![cond("Ready", "True", "Ready", 1)];
        assert!(set_condition(
            &mut list,
            cond("Degraded", "False", "AsExpected", 2)
        ));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn set_condition_keeps_one_per_type() {
        let mut list = vec![cond("Ready", "True", "Ready", 1)];
        set_condition(&mut list, cond("Ready", "False", "Failed", 2));
        set_condition(&mut list, cond("Ready", "False", "InProgress", 3));
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].reason, "InProgress");
    }

    #[test]
    fn set_condition_preserves_transition_time_when_status_unchanged() {
        let mut list = vec![cond("Ready", "False", "InProgress", 10)];
        let changed =
            set_condition(&mut list, cond("Ready", "False", "Failed", 20));
        assert!(changed);
        assert_eq!(list[0].last_transition_time, at(10));
        assert_eq!(list[0].reason, "Failed");
    }

    #[test]
    fn set_condition_bumps_transition_time_on_flip() {
        let mut list = vec![cond("Ready", "False", "InProgress", 10)];
        set_condition(&mut list, cond("Ready", "True", "Ready", 20));
        assert_eq!(list[0].last_transition_time, at(20));
    }

    #[test]
    fn set_condition_reports_no_change_for_identical_content() {
        let mut list = vec![cond("Ready", "True", "Ready", 10)];
        assert!(!set_condition(
            &mut list,
            cond("Ready", "True", "Ready", 99)
        ));
        assert_eq!(list[0].last_transition_time, at(10));
    }

    #[test]
    fn truthiness_is_case_insensitive() {
        assert!(is_condition_true(&cond("Ready", "true", "", 0)));
        assert!(is_condition_false(&cond("Ready", "FALSE", "", 0)));
        assert!(!is_condition_true(&cond("Ready", "Unknown", "", 0)));
    }

    #[test]
    fn find_condition_by_type() {
        let list = vec![
            cond("Ready", "True", "Ready", 1),
            cond("CreateOnlyMode", "True", "Enabled", 1),
        ];
        assert_eq!(
            find_condition(&list, "CreateOnlyMode").map(|c| c.reason.as_str()),
            Some("Enabled")
        );
        assert!(find_condition(&list, "Upgradeable").is_none());
    }
}
