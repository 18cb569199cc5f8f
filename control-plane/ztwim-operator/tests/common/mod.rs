#![allow(dead_code)]

use std::fmt::Debug;
use std::time::Duration;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use kube::{
    Client, Resource,
    api::{Api, Patch, PatchParams, PostParams},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use tokio::task::JoinHandle;
use ztwim_operator::config::OperatorConfig;
use ztwim_operator::crd::zero_trust_workload_identity_manager::{
    ZeroTrustWorkloadIdentityManager, ZeroTrustWorkloadIdentityManagerSpec,
};

// DNS-1123 safe numeric suffix for unique names
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

pub fn test_config() -> OperatorConfig {
    OperatorConfig {
        resync_interval_secs: 5,
        error_requeue_secs: 2,
        ..Default::default()
    }
}

pub fn spawn_controller(client: Client) -> JoinHandle<()> {
    tokio::spawn(async move {
        let _ = ztwim_operator::controller::run_controller(client, test_config())
            .await;
    })
}

pub fn ztwim(name: &str) -> ZeroTrustWorkloadIdentityManager {
    ZeroTrustWorkloadIdentityManager::new(
        name,
        ZeroTrustWorkloadIdentityManagerSpec {
            trust_domain: "apps.example.test".into(),
            cluster_name: "it".into(),
            bundle_config_map: "spire-bundle".into(),
            ..Default::default()
        },
    )
}

/// Create a cluster-scoped object, tolerating leftovers from earlier runs.
pub async fn ensure_created<K>(client: Client, obj: &K) -> K
where
    K: Resource<DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned,
{
    let api: Api<K> = Api::all(client);
    match api.create(&PostParams::default(), obj).await {
        Ok(created) => created,
        Err(kube::Error::Api(ae)) if ae.code == 409 => obj.clone(),
        Err(e) => panic!("create failed: {e}"),
    }
}

/// Pretend to be the operand's own controller and publish a Ready condition.
pub async fn set_operand_ready<K>(client: Client, name: &str, ready: bool)
where
    K: Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned,
{
    let api: Api<K> = Api::all(client);
    let (status, reason, message) = if ready {
        ("True", "Ready", "ready")
    } else {
        ("False", "Failed", "statefulset unavailable")
    };
    let cond = Condition {
        type_: "Ready".into(),
        status: status.into(),
        reason: reason.into(),
        message: message.into(),
        last_transition_time: Time(chrono::Utc::now()),
        observed_generation: None,
    };
    let patch = json!({ "status": { "conditions": [cond] } });
    api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .expect("patch operand status");
}

/// Poll the top-level resource until `pred` holds for its Ready condition.
pub async fn wait_for_ready_condition<F>(
    client: Client,
    name: &str,
    mut pred: F,
) -> Condition
where
    F: FnMut(&Condition) -> bool,
{
    let api: Api<ZeroTrustWorkloadIdentityManager> = Api::all(client);
    let mut last = None;
    for _ in 0..60 {
        if let Ok(Some(obj)) = api.get_opt(name).await {
            let ready = obj
                .status
                .as_ref()
                .and_then(|s| s.conditions.iter().find(|c| c.type_ == "Ready"))
                .cloned();
            if let Some(c) = ready {
                if pred(&c) {
                    return c;
                }
                last = Some(c);
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    panic!("Ready condition never matched; last seen: {last:?}");
}

// RAII guard to ensure controller abort + cleanup of cluster-scoped objects
pub struct ClusterGuard {
    client: Client,
    ctrl: Option<JoinHandle<()>>,
    cleanups: Vec<Box<dyn FnOnce(Client) -> JoinHandle<()> + Send>>,
}

impl ClusterGuard {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            ctrl: None,
            cleanups: Vec::new(),
        }
    }

    pub fn with_controller(mut self, ctrl: JoinHandle<()>) -> Self {
        self.ctrl = Some(ctrl);
        self
    }

    pub fn delete_on_drop<K>(&mut self, name: &str)
    where
        K: Resource<DynamicType = ()>
            + Clone
            + Debug
            + DeserializeOwned
            + Send
            + 'static,
    {
        let name = name.to_string();
        self.cleanups.push(Box::new(move |client| {
            tokio::spawn(async move {
                let api: Api<K> = Api::all(client);
                let _ = api.delete(&name, &Default::default()).await;
            })
        }));
    }
}

impl Drop for ClusterGuard {
    fn drop(&mut self) {
        if let Some(ref handle) = self.ctrl {
            handle.abort();
        }
        for cleanup in self.cleanups.drain(..) {
            let _ = cleanup(self.client.clone());
        }
    }
}
