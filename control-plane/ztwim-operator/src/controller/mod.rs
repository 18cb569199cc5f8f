use std::sync::Arc;

use futures_util::StreamExt;
use kube::{
    Client,
    api::Api,
    runtime::{Controller, controller::Action, watcher::Config},
};
use tracing::{error, info, warn};

use crate::config::OperatorConfig;
use crate::crd::operands::{
    SpiffeCsiDriver, SpireAgent, SpireOidcDiscoveryProvider, SpireServer,
};
use crate::crd::zero_trust_workload_identity_manager::{
    ZeroTrustWorkloadIdentityManager,
};

pub mod aggregate;
pub mod classify;
pub mod conditions;
pub mod decision;
pub mod operand;
pub mod reconcile;
pub mod status_manager;
pub mod upgradeable;
pub mod watch;


#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("kube error: {0}")]
    Kube(#[from] kube::Error),
    #[error("write to {name} still conflicting after {attempts} attempts")]
    StatusConflict { name: String, attempts: usize },
}

#[derive(Clone)]
pub struct ControllerContext {
    pub client: Client,
    pub cfg: OperatorConfig,
}

pub async fn run_controller(
    client: Client,
    cfg: OperatorConfig,
) -> anyhow::Result<()> {
    let api: Api<ZeroTrustWorkloadIdentityManager> = Api::all(client.clone());
    let ctx = Arc::new(ControllerContext {
        client: client.clone(),
        cfg,
    });

    Controller::new(api, Config::default())
        .watches_stream(
            watch::operand_trigger_stream::<SpireServer>(client.clone()),
            watch::to_singleton,
        )
        .watches_stream(
            watch::operand_trigger_stream::<SpireAgent>(client.clone()),
            watch::to_singleton,
        )
        .watches_stream(
            watch::operand_trigger_stream::<SpiffeCsiDriver>(client.clone()),
            watch::to_singleton,
        )
        .watches_stream(
            watch::operand_trigger_stream::<SpireOidcDiscoveryProvider>(client),
            watch::to_singleton,
        )
        .shutdown_on_signal()
        .run(reconcile::reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    info!(name = %obj_ref.name, "reconciled: {:?}", action)
                }
                Err(e) => error!(error = ?e, "reconcile error"),
            }
        })
        .await;

    info!("controller stopped");
    Ok(())
}

fn error_policy(
    obj: Arc<ZeroTrustWorkloadIdentityManager>,
    error: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    warn!(
        name = %kube::ResourceExt::name_any(obj.as_ref()),
        %error,
        "reconcile failed; requeueing"
    );
    Action::requeue(ctx.cfg.error_requeue())
}
