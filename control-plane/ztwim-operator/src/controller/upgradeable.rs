//! Upgrade-safety decision and its best-effort publication to OLM.
//!
//! The decision is written into the `Upgradeable` condition of the
//! OperatorCondition OLM injects next to the operator. Running without OLM
//! is supported, so nothing in here ever fails the reconcile.

use std::fmt;

use kube::{Api, Client, Resource};
use serde_json::{Value as JsonValue, json};
use tracing::{debug, info, instrument, warn};

use super::conditions::{
    CONDITION_UPGRADEABLE, ConditionStatus, new_condition, set_condition,
};
use super::operand::MSG_CR_NOT_FOUND;
use super::status_manager::{PatchTarget, WriteOutcome, patch_with_retry};
use crate::config::OperatorConfig;
use crate::crd::operator_condition::OperatorCondition;
use crate::crd::zero_trust_workload_identity_manager::OperandStatus;

pub const UPGRADEABLE_REASON_READY: &str = "Ready";
pub const UPGRADEABLE_REASON_NOT_READY: &str = "OperandsNotReady";
pub const MSG_UPGRADEABLE: &str = "Operator is Upgradeable";
pub const MSG_CREATE_ONLY_BLOCKS: &str =
    "Create-only mode is enabled; upgrades are blocked until it is disabled";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpgradeDecision {
    pub upgradeable: bool,
    pub reason: &'static str,
    pub message: String,
}

/// Create-only mode blocks unconditionally. Otherwise only operands that
/// exist and are unhealthy block; a never-created operand does not.
pub fn evaluate_upgradeable(
    create_only_enabled: bool,
    statuses: &[OperandStatus],
) -> UpgradeDecision {
    if create_only_enabled {
        return UpgradeDecision {
            upgradeable: false,
            reason: UPGRADEABLE_REASON_NOT_READY,
            message: MSG_CREATE_ONLY_BLOCKS.to_string(),
        };
    }

    let blocking: Vec<&str> = statuses
        .iter()
        .filter(|s| !s.is_ready() && s.message != MSG_CR_NOT_FOUND)
        .map(|s| s.kind.as_str())
        .collect();
    if !blocking.is_empty() {
        return UpgradeDecision {
            upgradeable: false,
            reason: UPGRADEABLE_REASON_NOT_READY,
            message: format!("Operands not ready: [{}]", blocking.join(", ")),
        };
    }

    UpgradeDecision {
        upgradeable: true,
        reason: UPGRADEABLE_REASON_READY,
        message: MSG_UPGRADEABLE.to_string(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// No OperatorCondition name configured: not running under OLM.
    NotConfigured,
    NotFound,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpgradeableOutcome {
    Applied,
    Unchanged,
    Skipped(SkipReason),
    Failed(String),
}

impl fmt::Display for UpgradeableOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeableOutcome::Applied => f.write_str("applied"),
            UpgradeableOutcome::Unchanged => f.write_str("unchanged"),
            UpgradeableOutcome::Skipped(SkipReason::NotConfigured) => {
                f.write_str("skipped: operator condition not configured")
            }
            UpgradeableOutcome::Skipped(SkipReason::NotFound) => {
                f.write_str("skipped: operator condition not found")
            }
            UpgradeableOutcome::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}

/// New `spec` for the OperatorCondition, or `None` when the Upgradeable
/// condition already says the same thing.
pub fn upgradeable_spec_patch(
    current: &OperatorCondition,
    decision: &UpgradeDecision,
) -> Option<JsonValue> {
    let mut conditions = current.spec.conditions.clone();
    let changed = set_condition(
        &mut conditions,
        new_condition(
            CONDITION_UPGRADEABLE,
            ConditionStatus::from_bool(decision.upgradeable),
            decision.reason,
            decision.message.clone(),
            current.meta().generation,
        ),
    );
    changed.then(|| json!({ "conditions": conditions }))
}

/// Publish `decision` to the configured OperatorCondition. Never errors;
/// the outcome says what happened.
#[instrument(level = "debug", skip(client, cfg, decision))]
pub async fn report_upgradeable(
    client: Client,
    cfg: &OperatorConfig,
    decision: &UpgradeDecision,
) -> UpgradeableOutcome {
    let Some(name) = cfg.operator_condition_name.as_deref() else {
        debug!("OPERATOR_CONDITION_NAME unset; not reporting upgradeability");
        return UpgradeableOutcome::Skipped(SkipReason::NotConfigured);
    };

    let api: Api<OperatorCondition> =
        Api::namespaced(client, &cfg.namespace);
    let res = patch_with_retry(
        &api,
        name,
        PatchTarget::Spec,
        cfg.status_update_retries,
        |current| upgradeable_spec_patch(current, decision),
    )
    .await;

    let outcome = match res {
        Ok(WriteOutcome::Written) => UpgradeableOutcome::Applied,
        Ok(WriteOutcome::Unchanged) => UpgradeableOutcome::Unchanged,
        Ok(WriteOutcome::Missing) => {
            UpgradeableOutcome::Skipped(SkipReason::NotFound)
        }
        Err(e) => UpgradeableOutcome::Failed(e.to_string()),
    };
    match &outcome {
        UpgradeableOutcome::Failed(msg) => {
            warn!(
                %name,
                namespace = %cfg.namespace,
                error = %msg,
                "failed to update Upgradeable condition"
            );
        }
        UpgradeableOutcome::Skipped(_) => {
            info!(
                %name,
                namespace = %cfg.namespace,
                %outcome,
                "Upgradeable condition not reported"
            );
        }
        UpgradeableOutcome::Applied => {
            info!(
                %name,
                upgradeable = decision.upgradeable,
                reason = decision.reason,
                "Upgradeable condition updated"
            );
        }
        UpgradeableOutcome::Unchanged => {}
    }
    outcome
}
