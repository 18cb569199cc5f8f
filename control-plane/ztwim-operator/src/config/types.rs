use std::time::Duration;

use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct OperatorConfig {
    /// Namespace the operator (and its OLM OperatorCondition) lives in.
    /// Env: OPERATOR_NAMESPACE
    #[envconfig(
        from = "OPERATOR_NAMESPACE",
        default = "zero-trust-workload-identity-manager"
    )]
    pub namespace: String,

    /// Name of the OLM OperatorCondition injected by OLM. When unset the
    /// operator runs outside OLM and upgradeability is not reported.
    /// Env: OPERATOR_CONDITION_NAME
    #[envconfig(from = "OPERATOR_CONDITION_NAME")]
    pub operator_condition_name: Option<String>,

    /// Default tracing directive; RUST_LOG still takes precedence.
    #[envconfig(from = "ZTWIM_LOG_LEVEL", default = "info")]
    pub log_level: String,

    /// Periodic requeue after a successful pass.
    /// Env: ZTWIM_RESYNC_INTERVAL_SECS
    #[envconfig(from = "ZTWIM_RESYNC_INTERVAL_SECS", default = "300")]
    pub resync_interval_secs: u64,

    #[envconfig(from = "ZTWIM_ERROR_REQUEUE_SECS", default = "30")]
    pub error_requeue_secs: u64,

    /// Attempts for status writes that hit a resourceVersion conflict.
    /// Env: ZTWIM_STATUS_UPDATE_RETRIES
    #[envconfig(from = "ZTWIM_STATUS_UPDATE_RETRIES", default = "5")]
    pub status_update_retries: usize,

    #[envconfig(from = "HTTP_PORT", default = "8081")]
    pub http_port: u16,
}

impl OperatorConfig {
    /// Treat blank values as unset and clamp counters that must be positive.
    pub fn normalize(mut self) -> Self {
        self.operator_condition_name = self
            .operator_condition_name
            .take()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if self.status_update_retries == 0 {
            self.status_update_retries = 1;
        }
        if self.log_level.trim().is_empty() {
            self.log_level = "info".into();
        }
        self
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            namespace: "zero-trust-workload-identity-manager".into(),
            operator_condition_name: None,
            log_level: "info".into(),
            resync_interval_secs: 300,
            error_requeue_secs: 30,
            status_update_retries: 5,
            http_port: 8081,
        }
    }
}
