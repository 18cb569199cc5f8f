//! Operand CRDs. Each one is reconciled by its own controller; this operator
//! only reads their status conditions. Spec fields are kept to what those
//! controllers consume.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status shape shared by every operand CR.
#[derive(
    Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct OperandCrStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(
    CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default,
)]
#[kube(
    group = "operator.openshift.io",
    version = "v1alpha1",
    kind = "SpireServer",
    plural = "spireservers",
    status = "OperandCrStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct SpireServerSpec {
    pub log_level: Option<String>,
    /// Issuer placed in JWT-SVIDs
    pub jwt_issuer: Option<String>,
    /// Validity of the server CA, e.g. "24h"
    pub ca_validity: Option<String>,
    pub default_x509_validity: Option<String>,
    pub default_jwt_validity: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(
    CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default,
)]
#[kube(
    group = "operator.openshift.io",
    version = "v1alpha1",
    kind = "SpireAgent",
    plural = "spireagents",
    status = "OperandCrStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct SpireAgentSpec {
    pub log_level: Option<String>,
    /// Host path of the agent's workload API socket
    pub socket_path: Option<String>,
    /// Enables the k8s_psat node attestor
    pub node_attestor_psat: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(
    CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default,
)]
#[kube(
    group = "operator.openshift.io",
    version = "v1alpha1",
    kind = "SpiffeCSIDriver",
    root = "SpiffeCsiDriver",
    plural = "spiffecsidrivers",
    status = "OperandCrStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct SpiffeCsiDriverSpec {
    /// Directory of the agent socket mounted into the driver
    pub agent_socket_path: Option<String>,
    /// CSIDriver name, default "csi.spiffe.io"
    pub plugin_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(
    CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default,
)]
#[kube(
    group = "operator.openshift.io",
    version = "v1alpha1",
    kind = "SpireOIDCDiscoveryProvider",
    root = "SpireOidcDiscoveryProvider",
    plural = "spireoidcdiscoveryproviders",
    status = "OperandCrStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct SpireOidcDiscoveryProviderSpec {
    pub jwt_issuer: Option<String>,
    pub agent_socket_name: Option<String>,
    pub replica_count: Option<i32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}
