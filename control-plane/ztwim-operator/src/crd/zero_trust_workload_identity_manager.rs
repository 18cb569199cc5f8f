use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cluster-wide entry point for the SPIFFE/SPIRE stack. Only the instance
/// named `cluster` is reconciled.
#[derive(
    CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default,
)]
#[kube(
    group = "operator.openshift.io",
    version = "v1alpha1",
    kind = "ZeroTrustWorkloadIdentityManager",
    plural = "zerotrustworkloadidentitymanagers",
    shortname = "ztwim",
    status = "ZeroTrustWorkloadIdentityManagerStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ZeroTrustWorkloadIdentityManagerSpec {
    /// SPIFFE trust domain, e.g. "apps.example.com"
    pub trust_domain: String,
    /// Name used to identify this cluster in node attestation
    pub cluster_name: String,
    /// ConfigMap holding the trust bundle (default "spire-bundle")
    #[serde(default = "default_bundle_config_map")]
    pub bundle_config_map: String,
    /// Extra labels applied to every managed resource
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(
    Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct ZeroTrustWorkloadIdentityManagerStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Per-operand readiness, recomputed on every reconciliation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operands: Vec<OperandStatus>,
}

/// Readiness summary of one operand CR as surfaced on the top-level status.
#[derive(
    Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct OperandStatus {
    pub kind: String,
    pub name: String,
    /// "true" or "false"
    pub ready: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl OperandStatus {
    pub fn is_ready(&self) -> bool {
        self.ready == "true"
    }
}

fn default_bundle_config_map() -> String {
    "spire-bundle".into()
}
