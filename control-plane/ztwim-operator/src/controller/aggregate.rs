use super::classify::{OperandState, classify};
use super::conditions::{
    CONDITION_CREATE_ONLY_MODE, CONDITION_READY, find_condition,
    is_condition_true,
};
use super::operand::MSG_CR_NOT_FOUND;
use crate::crd::zero_trust_workload_identity_manager::OperandStatus;

/// Counters derived from one pass over every operand status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregateState {
    pub all_ready: bool,
    pub not_created_count: usize,
    pub failed_count: usize,
    pub any_operand_exists: bool,
    pub create_only_present: bool,
    pub create_only_enabled: bool,
    pub total: usize,
}

impl Default for AggregateState {
    fn default() -> Self {
        Self {
            all_ready: true,
            not_created_count: 0,
            failed_count: 0,
            any_operand_exists: false,
            create_only_present: false,
            create_only_enabled: false,
            total: 0,
        }
    }
}

impl AggregateState {
    pub fn absorb(mut self, status: &OperandStatus) -> Self {
        self.total += 1;

        if status.message != MSG_CR_NOT_FOUND {
            self.any_operand_exists = true;
            if let Some(c) =
                find_condition(&status.conditions, CONDITION_CREATE_ONLY_MODE)
            {
                self.create_only_present = true;
                if is_condition_true(c) {
                    self.create_only_enabled = true;
                }
            }
        }

        if !status.is_ready() {
            self.all_ready = false;
            match classify_operand(status) {
                OperandState::Progressing => self.not_created_count += 1,
                OperandState::Failed => self.failed_count += 1,
                // reason=Ready on a not-ready flag: counted in neither tally
                OperandState::Ready => {}
            }
        }

        self
    }
}

/// Order-independent fold over the per-operand statuses.
pub fn aggregate(statuses: &[OperandStatus]) -> AggregateState {
    statuses
        .iter()
        .fold(AggregateState::default(), AggregateState::absorb)
}

/// Classify a summarised operand using its Ready condition's reason.
pub fn classify_operand(status: &OperandStatus) -> OperandState {
    let reason = find_condition(&status.conditions, CONDITION_READY)
        .map(|c| c.reason.as_str());
    classify(status.is_ready(), reason, &status.message)
}
