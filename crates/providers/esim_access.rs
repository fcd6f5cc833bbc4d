use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const ORDER_PATH: &str = "/api/v1/open/esim/order";
const QUERY_PATH: &str = "/api/v1/open/esim/query";
const QUERY_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone)]
pub struct EsimAccessConfig {
    pub base_url: String,
    pub access_code: String,
    pub secret_key: String,
    pub timeout: Duration,
}

/// Stateless transport for the eSIM Access open API. Retries belong to callers.
pub struct EsimAccessClient {
    http: reqwest::Client,
    config: EsimAccessConfig,
}

#[derive(Debug, Error)]
pub enum EsimAccessError {
    #[error("eSIM Access request failed: {context} (status {status})")]
    Http {
        context: &'static str,
        status: u16,
        body: String,
    },
    #[error("eSIM Access rejected request: {context} (code {code:?}, message {message:?})")]
    Rejected {
        context: &'static str,
        status: u16,
        code: Option<String>,
        message: Option<String>,
        body: String,
    },
    #[error("eSIM Access response could not be decoded: {context}: {reason}")]
    Decode {
        context: &'static str,
        status: u16,
        reason: String,
        body: String,
    },
    #[error("eSIM Access transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to sign eSIM Access request")]
    Signing,
}

impl EsimAccessError {
    /// HTTP status reported by the provider, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            EsimAccessError::Http { status, .. }
            | EsimAccessError::Rejected { status, .. }
            | EsimAccessError::Decode { status, .. } => Some(*status),
            EsimAccessError::Transport(err) => err.status().map(|status| status.as_u16()),
            EsimAccessError::Signing => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EsimAccessEnvelope<T> {
    success: bool,
    error_code: Option<Value>,
    error_msg: Option<String>,
    obj: Option<T>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EsimAccessOrderObj {
    pub order_no: Option<String>,
    pub transaction_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub esim_list: Vec<EsimAccessProfile>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub package_list: Vec<EsimAccessPackage>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EsimAccessProfile {
    pub iccid: Option<String>,
    pub ac: Option<String>,
    pub qr_code_url: Option<String>,
    pub smdp_status: Option<String>,
    pub esim_status: Option<String>,
    pub total_volume: Option<i64>,
    pub expired_time: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub package_list: Vec<EsimAccessPackage>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EsimAccessPackage {
    pub package_code: Option<String>,
    pub package_name: Option<String>,
    #[serde(alias = "volume")]
    pub total_volume: Option<i64>,
    pub expired_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderPackage {
    pub package_code: String,
    pub count: i32,
}

impl EsimAccessOrderObj {
    /// First profile that already carries an ICCID.
    pub fn allocated_profile(&self) -> Option<&EsimAccessProfile> {
        self.esim_list
            .iter()
            .find(|profile| profile.iccid.as_deref().is_some_and(|v| !v.is_empty()))
    }
}

impl EsimAccessClient {
    pub fn new(config: EsimAccessConfig) -> Result<Self, EsimAccessError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Places an order. The returned object normally only carries `orderNo`;
    /// profiles are allocated asynchronously.
    pub async fn create_order(
        &self,
        transaction_id: &str,
        packages: &[OrderPackage],
    ) -> Result<EsimAccessOrderObj, EsimAccessError> {
        let body = json!({
            "transactionId": transaction_id,
            "packageInfoList": packages,
        });
        self.post(ORDER_PATH, "create order", &body).await
    }

    pub async fn query_order(&self, order_no: &str) -> Result<EsimAccessOrderObj, EsimAccessError> {
        let body = json!({
            "orderNo": order_no,
            "iccid": "",
            "pager": { "pageNum": 1, "pageSize": QUERY_PAGE_SIZE },
        });
        self.post(QUERY_PATH, "query order", &body).await
    }

    async fn post<T>(
        &self,
        path: &str,
        context: &'static str,
        body: &Value,
    ) -> Result<T, EsimAccessError>
    where
        T: DeserializeOwned + Default,
    {
        let payload = body.to_string();
        let timestamp = Utc::now().timestamp_millis().to_string();
        let request_id = Uuid::new_v4().simple().to_string();
        let signature = sign_request(
            &self.config.secret_key,
            &timestamp,
            &request_id,
            &self.config.access_code,
            &payload,
        )?;

        debug!(path, %request_id, "esim_access: sending request");

        let resp = self
            .http
            .post(format!(
                "{}{}",
                self.config.base_url.trim_end_matches('/'),
                path
            ))
            .header(CONTENT_TYPE, "application/json")
            .header("RT-AccessCode", &self.config.access_code)
            .header("RT-RequestID", &request_id)
            .header("RT-Timestamp", &timestamp)
            .header("RT-Signature", signature)
            .body(payload)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        decode_envelope(context, status, &text).inspect_err(|err| {
            error!(
                status,
                %request_id,
                context,
                error = %err,
                response_body = %text,
                "esim_access: api request failed"
            );
        })
    }
}

/// `HMAC-SHA256(timestamp + requestId + accessCode + body)` keyed by the secret, lowercase hex.
pub fn sign_request(
    secret_key: &str,
    timestamp: &str,
    request_id: &str,
    access_code: &str,
    body: &str,
) -> Result<String, EsimAccessError> {
    let mut mac =
        HmacSha256::new_from_slice(secret_key.as_bytes()).map_err(|_| EsimAccessError::Signing)?;
    mac.update(timestamp.as_bytes());
    mac.update(request_id.as_bytes());
    mac.update(access_code.as_bytes());
    mac.update(body.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn decode_envelope<T>(context: &'static str, status: u16, body: &str) -> Result<T, EsimAccessError>
where
    T: DeserializeOwned + Default,
{
    if !(200..300).contains(&status) {
        return Err(EsimAccessError::Http {
            context,
            status,
            body: body.to_string(),
        });
    }

    let envelope: EsimAccessEnvelope<T> =
        serde_json::from_str(body).map_err(|err| EsimAccessError::Decode {
            context,
            status,
            reason: err.to_string(),
            body: body.to_string(),
        })?;

    if !envelope.success {
        return Err(EsimAccessError::Rejected {
            context,
            status,
            code: envelope.error_code.map(|code| match code {
                Value::String(code) => code,
                other => other.to_string(),
            }),
            message: envelope.error_msg,
            body: body.to_string(),
        });
    }

    Ok(envelope.obj.unwrap_or_default())
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
