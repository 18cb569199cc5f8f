use super::aggregate::{AggregateState, classify_operand};
use super::classify::OperandState;
use super::conditions::{
    CONDITION_CREATE_ONLY_MODE, CONDITION_OPERANDS_AVAILABLE, CONDITION_READY,
    ConditionStatus, REASON_CREATE_ONLY_DISABLED, REASON_CREATE_ONLY_ENABLED,
    REASON_FAILED, REASON_IN_PROGRESS, REASON_READY,
};
use super::operand::MSG_CR_NOT_FOUND;
use super::status_manager::StatusManager;
use crate::crd::zero_trust_workload_identity_manager::OperandStatus;

pub const MSG_ALL_READY: &str = "All operand CRs are ready";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    AllReady,
    Progressing,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopLevelDecision {
    pub outcome: Outcome,
    pub reason: &'static str,
    pub message: String,
}

impl TopLevelDecision {
    pub fn status(&self) -> ConditionStatus {
        ConditionStatus::from_bool(self.outcome == Outcome::AllReady)
    }
}

/// Pick the top-level outcome. Any failed operand outranks progressing ones.
pub fn decide(
    agg: &AggregateState,
    statuses: &[OperandStatus],
) -> TopLevelDecision {
    if agg.all_ready {
        return TopLevelDecision {
            outcome: Outcome::AllReady,
            reason: REASON_READY,
            message: MSG_ALL_READY.to_string(),
        };
    }

    if agg.not_created_count > 0 && agg.failed_count == 0 {
        let waiting: Vec<String> = statuses
            .iter()
            .filter(|s| classify_operand(s) == OperandState::Progressing)
            .map(|s| {
                if s.message == MSG_CR_NOT_FOUND {
                    format!("{}(not created)", s.kind)
                } else {
                    format!("{}(reconciling)", s.kind)
                }
            })
            .collect();
        return TopLevelDecision {
            outcome: Outcome::Progressing,
            reason: REASON_IN_PROGRESS,
            message: format!("Waiting for operands: [{}]", waiting.join(", ")),
        };
    }

    let failed: Vec<String> = statuses
        .iter()
        .filter(|s| classify_operand(s) == OperandState::Failed)
        .map(|s| format!("{}/{}", s.kind, s.name))
        .collect();
    TopLevelDecision {
        outcome: Outcome::Failed,
        reason: REASON_FAILED,
        message: format!("Some operands not ready: [{}]", failed.join(", ")),
    }
}

/// Stage the OperandsAvailable, Ready and (when any operand reports it)
/// CreateOnlyMode conditions.
pub fn record_decision(
    decision: &TopLevelDecision,
    agg: &AggregateState,
    mgr: &mut StatusManager,
) {
    mgr.add_condition(
        CONDITION_OPERANDS_AVAILABLE,
        decision.reason,
        decision.message.clone(),
        decision.status(),
    );
    mgr.add_condition(
        CONDITION_READY,
        decision.reason,
        decision.message.clone(),
        decision.status(),
    );

    if agg.create_only_present {
        if agg.create_only_enabled {
            mgr.add_condition(
                CONDITION_CREATE_ONLY_MODE,
                REASON_CREATE_ONLY_ENABLED,
                "Create-only mode is enabled on one or more operands",
                ConditionStatus::True,
            );
        } else {
            mgr.add_condition(
                CONDITION_CREATE_ONLY_MODE,
                REASON_CREATE_ONLY_DISABLED,
                "Create-only mode is disabled",
                ConditionStatus::False,
            );
        }
    }
}
