use std::time::Duration;

use super::stage::Stage;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub supabase: Supabase,
    pub esim_access: EsimAccess,
    pub esim_webhook: EsimWebhook,
    pub purchase: Purchase,
    pub stage: Stage,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// MiB
    pub body_limit: u64,
    /// Seconds
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone)]
pub struct Supabase {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct EsimAccess {
    pub base_url: String,
    pub access_code: String,
    pub secret_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct EsimWebhook {
    pub secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Purchase {
    pub idempotency_window: Duration,
    pub poll_max_attempts: u32,
    pub poll_base_delay: Duration,
}

impl Default for Purchase {
    fn default() -> Self {
        Self {
            idempotency_window: Duration::from_secs(30),
            poll_max_attempts: 3,
            poll_base_delay: Duration::from_millis(1000),
        }
    }
}
