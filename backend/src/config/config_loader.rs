use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result};

use super::{
    config_model::{
        BackendServer, Database, DotEnvyConfig, EsimAccess, EsimWebhook, Purchase, Supabase,
    },
    stage::Stage,
};

const DEFAULT_ESIM_ACCESS_BASE_URL: &str = "https://api.esimaccess.com";

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required_parsed("SERVER_PORT_BACKEND")?,
        body_limit: required_parsed("SERVER_BODY_LIMIT")?,
        timeout: required_parsed("SERVER_TIMEOUT")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_pool_size: optional_parsed("DATABASE_MAX_POOL_SIZE", 10)?,
    };

    let supabase = Supabase {
        jwt_secret: required("SUPABASE_JWT_SECRET")?,
    };

    let esim_access = EsimAccess {
        base_url: optional("ESIM_ACCESS_BASE_URL")
            .unwrap_or_else(|| DEFAULT_ESIM_ACCESS_BASE_URL.to_string()),
        access_code: required("ESIM_ACCESS_CODE")?,
        secret_key: required("ESIM_ACCESS_SECRET_KEY")?,
        timeout: Duration::from_secs(optional_parsed("ESIM_ACCESS_TIMEOUT_SECS", 30)?),
    };

    let esim_webhook = EsimWebhook {
        secret: optional("ESIM_WEBHOOK_SECRET"),
    };

    let defaults = Purchase::default();
    let purchase = Purchase {
        idempotency_window: Duration::from_secs(optional_parsed(
            "PURCHASE_IDEMPOTENCY_WINDOW_SECS",
            defaults.idempotency_window.as_secs(),
        )?),
        poll_max_attempts: optional_parsed(
            "PURCHASE_POLL_MAX_ATTEMPTS",
            defaults.poll_max_attempts,
        )?,
        poll_base_delay: Duration::from_millis(optional_parsed(
            "PURCHASE_POLL_BASE_DELAY_MS",
            defaults.poll_base_delay.as_millis() as u64,
        )?),
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        supabase,
        esim_access,
        esim_webhook,
        purchase,
        stage: get_stage(),
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or_default();
    Stage::try_from(stage_str.as_str()).unwrap_or_default()
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(key: &str) -> Result<String> {
    optional(key).with_context(|| format!("{key} is invalid"))
}

fn required_parsed<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    required(key)?
        .parse()
        .with_context(|| format!("{key} is invalid"))
}

fn optional_parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw.parse().with_context(|| format!("{key} is invalid")),
        None => Ok(default),
    }
}
