use std::sync::Arc;

use kube::{Api, Resource, ResourceExt, runtime::controller::Action};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::aggregate::{AggregateState, aggregate};
use super::decision::{TopLevelDecision, decide, record_decision};
use super::operand::fetch_operand_status;
use super::status_manager::{
    PatchTarget, StatusManager, WriteOutcome, mark_reconciliation_started,
    patch_with_retry,
};
use super::upgradeable::{
    UpgradeDecision, evaluate_upgradeable, report_upgradeable,
};
use super::{ControllerContext, ReconcileErr};
use crate::crd::SINGLETON_NAME;
use crate::crd::operands::{
    SpiffeCsiDriver, SpireAgent, SpireOidcDiscoveryProvider, SpireServer,
};
use crate::crd::zero_trust_workload_identity_manager::{
    OperandStatus, ZeroTrustWorkloadIdentityManager,
    ZeroTrustWorkloadIdentityManagerStatus,
};

/// Everything one pass derives from the operand statuses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub aggregate: AggregateState,
    pub decision: TopLevelDecision,
    pub upgrade: UpgradeDecision,
}

pub fn evaluate(operands: &[OperandStatus]) -> Evaluation {
    let agg = aggregate(operands);
    let decision = decide(&agg, operands);
    let upgrade = evaluate_upgradeable(agg.create_only_enabled, operands);
    Evaluation {
        aggregate: agg,
        decision,
        upgrade,
    }
}

/// The status to write, or `None` when `current` already matches it.
pub fn desired_status(
    current: Option<&ZeroTrustWorkloadIdentityManagerStatus>,
    generation: Option<i64>,
    operands: &[OperandStatus],
    eval: &Evaluation,
) -> Option<ZeroTrustWorkloadIdentityManagerStatus> {
    let mut status = current.cloned().unwrap_or_default();

    let mut mgr = StatusManager::new();
    record_decision(&eval.decision, &eval.aggregate, &mut mgr);
    let conditions_changed = mgr.apply_to(&mut status.conditions, generation);

    let operands_changed = status.operands.as_slice() != operands;
    status.operands = operands.to_vec();

    (conditions_changed || operands_changed).then_some(status)
}

#[instrument(skip(obj, ctx), fields(name = %obj.name_any()))]
pub async fn reconcile(
    obj: Arc<ZeroTrustWorkloadIdentityManager>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    let name = obj.name_any();
    if name != SINGLETON_NAME {
        warn!(%name, "only '{SINGLETON_NAME}' is reconciled; ignoring");
        return Ok(Action::await_change());
    }
    if obj.meta().deletion_timestamp.is_some() {
        info!(%name, "being deleted; nothing to aggregate");
        return Ok(Action::await_change());
    }

    let api: Api<ZeroTrustWorkloadIdentityManager> =
        Api::all(ctx.client.clone());
    let retries = ctx.cfg.status_update_retries;

    // Ready=False stays visible if the pass dies before the final write.
    let marked =
        patch_with_retry(&api, &name, PatchTarget::Status, retries, |current| {
            let mut conditions = current
                .status
                .as_ref()
                .map(|s| s.conditions.clone())
                .unwrap_or_default();
            let generation = current.meta().generation;
            mark_reconciliation_started(&mut conditions, generation)
                .then(|| json!({ "conditions": conditions }))
        })
        .await?;
    if marked == WriteOutcome::Missing {
        debug!(%name, "resource vanished before reconcile started");
        return Ok(Action::await_change());
    }

    let client = &ctx.client;
    let (server, agent, csi, oidc) = tokio::join!(
        fetch_operand_status::<SpireServer>(client.clone()),
        fetch_operand_status::<SpireAgent>(client.clone()),
        fetch_operand_status::<SpiffeCsiDriver>(client.clone()),
        fetch_operand_status::<SpireOidcDiscoveryProvider>(client.clone()),
    );
    let operands = vec![server, agent, csi, oidc];
    let eval = evaluate(&operands);
    info!(
        outcome = ?eval.decision.outcome,
        not_created = eval.aggregate.not_created_count,
        failed = eval.aggregate.failed_count,
        message = %eval.decision.message,
        "operands aggregated"
    );

    let written =
        patch_with_retry(&api, &name, PatchTarget::Status, retries, |current| {
            desired_status(
                current.status.as_ref(),
                current.meta().generation,
                &operands,
                &eval,
            )
            .map(|st| {
                json!({ "conditions": st.conditions, "operands": st.operands })
            })
        })
        .await?;
    debug!(%name, ?written, "status write");

    let outcome =
        report_upgradeable(ctx.client.clone(), &ctx.cfg, &eval.upgrade).await;
    debug!(
        %outcome,
        upgradeable = eval.upgrade.upgradeable,
        "upgradeability reported"
    );

    Ok(Action::requeue(ctx.cfg.resync_interval()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::conditions::find_condition;
    use crate::controller::operand::{
        OperandKind, operand_status_from_conditions, operand_status_from_lookup,
    };
    use chrono::{TimeZone, Utc};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};

    fn ready(kind: OperandKind) -> OperandStatus {
        operand_status_from_conditions(
            kind,
            &[Condition {
                type_: "Ready".into(),
                status: "True".into(),
                reason: "Ready".into(),
                message: String::new(),
                last_transition_time: Time(Utc.timestamp_opt(0, 0).unwrap()),
                observed_generation: None,
            }],
        )
    }

    fn all_ready() -> Vec<OperandStatus> {
        OperandKind::ALL.into_iter().map(ready).collect()
    }

    #[test]
    fn first_pass_writes_conditions_and_operands() {
        let operands = all_ready();
        let eval = evaluate(&operands);
        let st = desired_status(None, Some(1), &operands, &eval).unwrap();
        assert_eq!(st.operands.len(), 4);
        let ready = find_condition(&st.conditions, "Ready").unwrap();
        assert_eq!(ready.status, "True");
        assert_eq!(ready.observed_generation, Some(1));
        assert!(find_condition(&st.conditions, "OperandsAvailable").is_some());
        assert!(find_condition(&st.conditions, "CreateOnlyMode").is_none());
    }

    #[test]
    fn unchanged_status_is_not_rewritten() {
        let operands = all_ready();
        let eval = evaluate(&operands);
        let st = desired_status(None, Some(1), &operands, &eval).unwrap();
        assert!(desired_status(Some(&st), Some(1), &operands, &eval).is_none());
    }

    #[test]
    fn operand_change_alone_triggers_a_write() {
        let operands = all_ready();
        let eval = evaluate(&operands);
        let st = desired_status(None, Some(1), &operands, &eval).unwrap();

        // Same verdict (Failed) but a different operand message
        let broken = |msg: &str| {
            let mut ops = all_ready();
            ops[0] = operand_status_from_lookup(OperandKind::SpireServer, Err(msg));
            ops
        };
        let first = broken("timeout");
        let st = desired_status(Some(&st), Some(1), &first, &evaluate(&first))
            .unwrap();
        let second = broken("forbidden");
        let eval = evaluate(&second);
        let next = desired_status(Some(&st), Some(1), &second, &eval).unwrap();
        assert_eq!(next.operands[0].message, "Failed to get CR: forbidden");
    }

    #[test]
    fn new_generation_restamps_conditions() {
        let operands = all_ready();
        let eval = evaluate(&operands);
        let st = desired_status(None, Some(1), &operands, &eval).unwrap();
        let next = desired_status(Some(&st), Some(2), &operands, &eval).unwrap();
        let ready = find_condition(&next.conditions, "Ready").unwrap();
        assert_eq!(ready.observed_generation, Some(2));
    }

    #[test]
    fn initial_marker_is_replaced_by_the_verdict() {
        let mut conditions = Vec::new();
        mark_reconciliation_started(&mut conditions, Some(1));
        let current = ZeroTrustWorkloadIdentityManagerStatus {
            conditions,
            operands: Vec::new(),
        };
        let operands = all_ready();
        let eval = evaluate(&operands);
        let st =
            desired_status(Some(&current), Some(1), &operands, &eval).unwrap();
        let ready = find_condition(&st.conditions, "Ready").unwrap();
        assert_eq!(ready.reason, "Ready");
        assert_eq!(
            st.conditions.iter().filter(|c| c.type_ == "Ready").count(),
            1
        );
    }
}
