//! Batches condition updates for one reconciliation and writes them back
//! with optimistic concurrency.

use std::fmt::Debug;
use std::time::Duration;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};
use tracing::{debug, trace};

use super::ReconcileErr;
use super::conditions::{
    CONDITION_READY, ConditionStatus, REASON_RECONCILING, find_condition,
    new_condition, set_condition,
};

pub const MSG_RECONCILIATION_STARTED: &str = "Reconciliation in progress";

#[derive(Clone, Debug, PartialEq, Eq)]
struct PendingCondition {
    type_: String,
    reason: String,
    message: String,
    status: ConditionStatus,
}

#[derive(Clone, Debug, Default)]
pub struct StatusManager {
    pending: Vec<PendingCondition>,
}

impl StatusManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a condition; a later call for the same type replaces it.
    pub fn add_condition(
        &mut self,
        type_: &str,
        reason: &str,
        message: impl Into<String>,
        status: ConditionStatus,
    ) {
        let incoming = PendingCondition {
            type_: type_.to_string(),
            reason: reason.to_string(),
            message: message.into(),
            status,
        };
        match self.pending.iter_mut().find(|p| p.type_ == incoming.type_) {
            Some(slot) => *slot = incoming,
            None => self.pending.push(incoming),
        }
    }

    /// Merge staged conditions into `conditions`, stamping the generation.
    /// Returns whether anything other than transition times changed.
    pub fn apply_to(
        &self,
        conditions: &mut Vec<Condition>,
        generation: Option<i64>,
    ) -> bool {
        let mut changed = false;
        for p in &self.pending {
            changed |= set_condition(
                conditions,
                new_condition(
                    &p.type_,
                    p.status,
                    &p.reason,
                    p.message.clone(),
                    generation,
                ),
            );
        }
        changed
    }
}

/// A resource needs the not-yet-reconciled marker when it has never had a
/// Ready condition or its Ready condition describes an older generation.
pub fn needs_initial_reconciliation_status(
    conditions: &[Condition],
    generation: Option<i64>,
) -> bool {
    match find_condition(conditions, CONDITION_READY) {
        None => true,
        Some(c) => c.observed_generation != generation,
    }
}

/// Mark Ready=False/Reconciling before any other work of the pass. Returns
/// whether the list changed.
pub fn mark_reconciliation_started(
    conditions: &mut Vec<Condition>,
    generation: Option<i64>,
) -> bool {
    if !needs_initial_reconciliation_status(conditions, generation) {
        return false;
    }
    let mut mgr = StatusManager::new();
    mgr.add_condition(
        CONDITION_READY,
        REASON_RECONCILING,
        MSG_RECONCILIATION_STARTED,
        ConditionStatus::False,
    );
    mgr.apply_to(conditions, generation)
}

/// Which part of the object a patch replaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchTarget {
    Status,
    Spec,
}

impl PatchTarget {
    fn field(self) -> &'static str {
        match self {
            PatchTarget::Status => "status",
            PatchTarget::Spec => "spec",
        }
    }
}

/// Merge-patch body carrying the observed resourceVersion, so the API server
/// rejects the write with 409 if the object moved underneath us.
pub fn conditional_patch_body(
    resource_version: Option<&str>,
    target: PatchTarget,
    value: JsonValue,
) -> JsonValue {
    let mut body = serde_json::Map::new();
    if let Some(rv) = resource_version {
        body.insert("metadata".into(), json!({ "resourceVersion": rv }));
    }
    body.insert(target.field().into(), value);
    JsonValue::Object(body)
}

/// Result of a successful [`patch_with_retry`] round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
    Missing,
}

/// Read-compute-write loop with retry on resourceVersion conflicts.
///
/// `desired` receives the freshly read object and returns the new value of
/// the target field, or `None` when nothing needs to be written.
pub async fn patch_with_retry<K, F>(
    api: &Api<K>,
    name: &str,
    target: PatchTarget,
    attempts: usize,
    mut desired: F,
) -> Result<WriteOutcome, ReconcileErr>
where
    K: Resource + Clone + DeserializeOwned + Debug,
    F: FnMut(&K) -> Option<JsonValue>,
{
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        let Some(current) = api.get_opt(name).await? else {
            debug!(%name, "patch_with_retry: object is gone; skipping write");
            return Ok(WriteOutcome::Missing);
        };
        let Some(value) = desired(&current) else {
            trace!(%name, ?target, "patch_with_retry: unchanged");
            return Ok(WriteOutcome::Unchanged);
        };
        let body = conditional_patch_body(
            current.resource_version().as_deref(),
            target,
            value,
        );
        let patch = Patch::Merge(&body);
        let pp = PatchParams::default();
        let res = match target {
            PatchTarget::Status => api.patch_status(name, &pp, &patch).await,
            PatchTarget::Spec => api.patch(name, &pp, &patch).await,
        };
        match res {
            Ok(_) => return Ok(WriteOutcome::Written),
            Err(kube::Error::Api(e)) if e.code == 409 => {
                debug!(%name, attempt, attempts, "patch_with_retry: conflict");
                tokio::time::sleep(Duration::from_millis(50 * attempt as u64))
                    .await;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(ReconcileErr::StatusConflict {
        name: name.to_string(),
        attempts,
    })
}
