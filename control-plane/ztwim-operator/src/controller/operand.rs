use std::fmt::{Debug, Display};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::{Api, Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::conditions::{
    CONDITION_CREATE_ONLY_MODE, CONDITION_READY, find_condition,
    is_condition_false, is_condition_true,
};
use crate::crd::SINGLETON_NAME;
use crate::crd::operands::{
    SpiffeCsiDriver, SpireAgent, SpireOidcDiscoveryProvider, SpireServer,
};
use crate::crd::zero_trust_workload_identity_manager::OperandStatus;

pub const MSG_CR_NOT_FOUND: &str = "CR not found";
pub const MSG_WAITING_INITIAL: &str = "Waiting for initial reconciliation";
pub const MSG_RECONCILING: &str = "Reconciling";
pub const MSG_READY: &str = "Ready";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperandKind {
    SpireServer,
    SpireAgent,
    SpiffeCsiDriver,
    SpireOidcDiscoveryProvider,
}

impl OperandKind {
    /// Order in which operands are reported on the top-level status.
    pub const ALL: [OperandKind; 4] = [
        OperandKind::SpireServer,
        OperandKind::SpireAgent,
        OperandKind::SpiffeCsiDriver,
        OperandKind::SpireOidcDiscoveryProvider,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperandKind::SpireServer => "SpireServer",
            OperandKind::SpireAgent => "SpireAgent",
            OperandKind::SpiffeCsiDriver => "SpiffeCSIDriver",
            OperandKind::SpireOidcDiscoveryProvider => {
                "SpireOIDCDiscoveryProvider"
            }
        }
    }
}

impl Display for OperandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cluster-scoped operand CR whose conditions feed the aggregate.
pub trait Operand:
    Resource<DynamicType = ()>
    + Clone
    + DeserializeOwned
    + Serialize
    + Debug
    + Send
    + Sync
    + 'static
{
    const KIND: OperandKind;

    fn conditions(&self) -> &[Condition];
}

macro_rules! impl_operand {
    ($ty:ty, $kind:expr) => {
        impl Operand for $ty {
            const KIND: OperandKind = $kind;

            fn conditions(&self) -> &[Condition] {
                self.status
                    .as_ref()
                    .map(|s| s.conditions.as_slice())
                    .unwrap_or_default()
            }
        }
    };
}

impl_operand!(SpireServer, OperandKind::SpireServer);
impl_operand!(SpireAgent, OperandKind::SpireAgent);
impl_operand!(SpiffeCsiDriver, OperandKind::SpiffeCsiDriver);
impl_operand!(
    SpireOidcDiscoveryProvider,
    OperandKind::SpireOidcDiscoveryProvider
);

/// Read the `cluster` instance of `K` and summarise it. Read failures are
/// folded into the returned status rather than returned.
#[instrument(level = "debug", skip(client), fields(kind = %K::KIND))]
pub async fn fetch_operand_status<K: Operand>(client: Client) -> OperandStatus {
    let api: Api<K> = Api::all(client);
    let lookup = api
        .get_opt(SINGLETON_NAME)
        .await
        .map(|found| found.map(|obj| obj.conditions().to_vec()));
    if let Err(e) = &lookup {
        warn!(kind = %K::KIND, error = %e, "failed to read operand CR");
    }
    let status = operand_status_from_lookup(K::KIND, lookup);
    debug!(
        kind = %K::KIND,
        ready = %status.ready,
        message = %status.message,
        "operand observed"
    );
    status
}

/// `Ok(None)` is the not-found case.
pub fn operand_status_from_lookup<E: Display>(
    kind: OperandKind,
    lookup: Result<Option<Vec<Condition>>, E>,
) -> OperandStatus {
    match lookup {
        Ok(Some(conditions)) => {
            operand_status_from_conditions(kind, &conditions)
        }
        Ok(None) => operand_status(kind, false, MSG_CR_NOT_FOUND, Vec::new()),
        Err(e) => operand_status(
            kind,
            false,
            format!("Failed to get CR: {e}"),
            Vec::new(),
        ),
    }
}

pub fn operand_status_from_conditions(
    kind: OperandKind,
    conditions: &[Condition],
) -> OperandStatus {
    if conditions.is_empty() {
        return operand_status(kind, false, MSG_WAITING_INITIAL, Vec::new());
    }

    let (ready, message) = match find_condition(conditions, CONDITION_READY) {
        Some(c) if is_condition_true(c) => (true, MSG_READY.to_string()),
        Some(c) => (false, c.message.clone()),
        None => (false, MSG_RECONCILING.to_string()),
    };
    operand_status(kind, ready, message, condense_conditions(conditions, ready))
}

/// Ready operands only surface a true CreateOnlyMode condition. Not-ready
/// operands also surface their Ready condition and every False condition.
pub fn condense_conditions(
    conditions: &[Condition],
    ready: bool,
) -> Vec<Condition> {
    conditions
        .iter()
        .filter(|c| {
            let create_only_on =
                c.type_ == CONDITION_CREATE_ONLY_MODE && is_condition_true(c);
            create_only_on
                || (!ready
                    && (c.type_ == CONDITION_READY || is_condition_false(c)))
        })
        .cloned()
        .collect()
}

fn operand_status(
    kind: OperandKind,
    ready: bool,
    message: impl Into<String>,
    conditions: Vec<Condition>,
) -> OperandStatus {
    OperandStatus {
        kind: kind.as_str().to_string(),
        name: SINGLETON_NAME.to_string(),
        ready: ready.to_string(),
        message: message.into(),
        conditions,
    }
}
