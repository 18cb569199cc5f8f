use envconfig::Envconfig;
use kube::Client;
use tracing::info;
use ztwim_operator::{config::OperatorConfig, init_tracing, runtime};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cfg = OperatorConfig::init_from_env()?.normalize();
    init_tracing(&cfg.log_level);
    info!(?cfg, "Starting zero trust workload identity manager");

    let client = Client::try_default().await?;
    runtime::run_all(client, cfg).await
}
