//! Typed environment configuration (spec §6.4). Loaded once at startup;
//! a missing required key is fatal before the server binds to anything.

#[derive(Debug, Clone)]
pub struct Settings {
    pub core_database_url: String,
    pub core_database_auth_token: Option<String>,
    pub secret_encryption_key: Option<String>,
    pub audit_log_retention_days: u32,
    pub backup_retention_days: u32,
    pub metrics_addr: Option<String>,
    pub node_id: Option<String>,
    pub node_role: Option<String>,
    pub shard_name: Option<String>,
    pub region_id: Option<String>,
    pub cluster_id: Option<String>,
    pub acme_email: Option<String>,
    pub acme_directory_url: Option<String>,
    pub port: u16,
    pub node_agent_shared_secret: String,
    pub convergence_fanout: usize,
    pub liveness_window_multiplier: u32,
}

impl Settings {
    /// Reads every key in spec.md §6.4 from the process environment.
    /// `TEMPORAL_*` is intentionally absent -- the in-process workflow
    /// adapter (see SPEC_FULL.md's "Workflow runtime adapter" section)
    /// has no external engine endpoint to point at.
    pub fn from_env() -> Self {
        Self {
            core_database_url: require_env("CORE_DATABASE_URL"),
            core_database_auth_token: optional_env("CORE_DATABASE_AUTH_TOKEN"),
            secret_encryption_key: optional_env("SECRET_ENCRYPTION_KEY"),
            audit_log_retention_days: optional_env("AUDIT_LOG_RETENTION_DAYS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(90),
            backup_retention_days: optional_env("BACKUP_RETENTION_DAYS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            metrics_addr: optional_env("METRICS_ADDR"),
            node_id: optional_env("NODE_ID"),
            node_role: optional_env("NODE_ROLE"),
            shard_name: optional_env("SHARD_NAME"),
            region_id: optional_env("REGION_ID"),
            cluster_id: optional_env("CLUSTER_ID"),
            acme_email: optional_env("ACME_EMAIL"),
            acme_directory_url: optional_env("ACME_DIRECTORY_URL"),
            port: optional_env("PORT").and_then(|v| v.parse().ok()).unwrap_or(8080),
            node_agent_shared_secret: optional_env("NODE_AGENT_SHARED_SECRET")
                .unwrap_or_else(|| "dev-shared-secret".to_string()),
            convergence_fanout: optional_env("CONVERGENCE_FANOUT").and_then(|v| v.parse().ok()).unwrap_or(8),
            liveness_window_multiplier: optional_env("LIVENESS_WINDOW_MULTIPLIER")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
        }
    }
}

fn require_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| panic!("{key} is required and was not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
