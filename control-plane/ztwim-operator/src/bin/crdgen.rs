use kube::core::CustomResourceExt;
use ztwim_operator::crd::operands::{
    SpiffeCsiDriver, SpireAgent, SpireOidcDiscoveryProvider, SpireServer,
};
use ztwim_operator::crd::operator_condition::OperatorCondition;
use ztwim_operator::crd::zero_trust_workload_identity_manager::{
    ZeroTrustWorkloadIdentityManager,
};

fn main() {
    let crds = [
        ZeroTrustWorkloadIdentityManager::crd(),
        SpireServer::crd(),
        SpireAgent::crd(),
        SpiffeCsiDriver::crd(),
        SpireOidcDiscoveryProvider::crd(),
        OperatorCondition::crd(),
    ];
    for crd in crds {
        let yaml = serde_yaml::to_string(&crd).expect("serialize CRD to YAML");
        println!("---\n{}", yaml.trim_end());
    }
}
