pub mod operands;
pub mod operator_condition;
pub mod zero_trust_workload_identity_manager;

/// API group shared by the top-level resource and every operand.
pub const GROUP: &str = "operator.openshift.io";

/// Every resource this operator aggregates is a singleton with this name.
pub const SINGLETON_NAME: &str = "cluster";
