//! Maps one operand's readiness signal onto Ready / Progressing / Failed.
//!
//! Structured reasons win when present; canonical messages and a substring
//! heuristic cover operands that only report free text.

use super::operand::{MSG_CR_NOT_FOUND, MSG_RECONCILING, MSG_WAITING_INITIAL};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperandState {
    Ready,
    Progressing,
    Failed,
}

/// Reasons operand controllers put on their Ready condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperandReason {
    InProgress,
    NotFound,
    InitialReconcile,
    Reconciling,
    Failed,
    Unhealthy,
    Ready,
}

impl OperandReason {
    pub const ALL: [OperandReason; 7] = [
        OperandReason::InProgress,
        OperandReason::NotFound,
        OperandReason::InitialReconcile,
        OperandReason::Reconciling,
        OperandReason::Failed,
        OperandReason::Unhealthy,
        OperandReason::Ready,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperandReason::InProgress => "InProgress",
            OperandReason::NotFound => "NotFound",
            OperandReason::InitialReconcile => "InitialReconcile",
            OperandReason::Reconciling => "Reconciling",
            OperandReason::Failed => "Failed",
            OperandReason::Unhealthy => "Unhealthy",
            OperandReason::Ready => "Ready",
        }
    }

    /// Exact, case-sensitive match against the known reason codes.
    pub fn parse(reason: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == reason)
    }

    /// A `Ready` reason on a not-ready flag still maps to Ready.
    pub fn state(self) -> OperandState {
        match self {
            OperandReason::InProgress
            | OperandReason::NotFound
            | OperandReason::InitialReconcile
            | OperandReason::Reconciling => OperandState::Progressing,
            OperandReason::Failed | OperandReason::Unhealthy => {
                OperandState::Failed
            }
            OperandReason::Ready => OperandState::Ready,
        }
    }
}

impl std::fmt::Display for OperandReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const PROGRESSING_MESSAGES: [&str; 3] =
    [MSG_CR_NOT_FOUND, MSG_WAITING_INITIAL, MSG_RECONCILING];

const PROGRESSING_FRAGMENTS: [&str; 4] =
    ["not found", "initial", "reconciling", "progressing"];

pub fn classify(
    ready: bool,
    reason: Option<&str>,
    message: &str,
) -> OperandState {
    if ready {
        return OperandState::Ready;
    }

    // Unknown reasons fall through to the message checks.
    if let Some(known) = reason
        .filter(|r| !r.is_empty())
        .and_then(OperandReason::parse)
    {
        return known.state();
    }

    if PROGRESSING_MESSAGES.contains(&message) {
        return OperandState::Progressing;
    }

    let lowered = message.to_lowercase();
    if PROGRESSING_FRAGMENTS.iter().any(|f| lowered.contains(f)) {
        return OperandState::Progressing;
    }

    OperandState::Failed
}
