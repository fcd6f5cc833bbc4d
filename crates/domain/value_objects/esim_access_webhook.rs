use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::value_objects::enums::notify_types::NotifyType;

/// Push notification as delivered by eSIM Access, before validation.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EsimAccessNotificationPayload {
    pub notify_type: Option<String>,
    #[serde(default)]
    pub content: Option<NotificationContent>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationContent {
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub transaction_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub iccid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub esim_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub smdp_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_volume: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub order_usage: Option<i64>,
    /// Remaining bytes for `DATA_USAGE`, remaining days for `VALIDITY_USAGE`.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub remain: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub expired_time: Option<String>,
}

/// A notification that passed shape validation and can be dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct EsimAccessNotification {
    pub notify_type: NotifyType,
    pub order_no: String,
    pub content: NotificationContent,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotificationParseError {
    #[error("empty webhook payload")]
    Empty,
    #[error("invalid webhook payload: {0}")]
    Malformed(String),
    #[error("notifyType is required")]
    MissingNotifyType,
    #[error("content.orderNo is required")]
    MissingOrderNo,
}

/// Normalizes a webhook delivery into one shape. The provider sends JSON most of the
/// time but falls back to form encoding with bracketed keys (`content[orderNo]=...`),
/// occasionally with an empty body and everything in the query string.
pub fn parse_notification(
    content_type: Option<&str>,
    body: &[u8],
    query: Option<&str>,
) -> Result<EsimAccessNotification, NotificationParseError> {
    let is_json = content_type
        .map(|value| value.to_ascii_lowercase().contains("json"))
        .unwrap_or(false)
        || body.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{');

    let value = if is_json {
        serde_json::from_slice::<Value>(body)
            .map_err(|err| NotificationParseError::Malformed(err.to_string()))?
    } else if !body.iter().all(u8::is_ascii_whitespace) {
        form_pairs_to_json(url::form_urlencoded::parse(body))
    } else if let Some(query) = query.filter(|q| !q.trim().is_empty()) {
        form_pairs_to_json(url::form_urlencoded::parse(query.as_bytes()))
    } else {
        return Err(NotificationParseError::Empty);
    };

    let payload: EsimAccessNotificationPayload = serde_json::from_value(value)
        .map_err(|err| NotificationParseError::Malformed(err.to_string()))?;
    payload.validate()
}

impl EsimAccessNotificationPayload {
    pub fn validate(self) -> Result<EsimAccessNotification, NotificationParseError> {
        let notify_type = self
            .notify_type
            .filter(|value| !value.trim().is_empty())
            .ok_or(NotificationParseError::MissingNotifyType)?;
        let content = self.content.unwrap_or_default();
        let order_no = content
            .order_no
            .clone()
            .filter(|value| !value.trim().is_empty())
            .ok_or(NotificationParseError::MissingOrderNo)?;

        Ok(EsimAccessNotification {
            notify_type: NotifyType::parse(&notify_type),
            order_no: order_no.trim().to_string(),
            content,
        })
    }
}

fn form_pairs_to_json<'a>(
    pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
) -> Value {
    let mut root = Map::new();

    for (key, value) in pairs {
        let value = Value::String(value.into_owned());
        match key.split_once('[') {
            Some((parent, rest)) if rest.ends_with(']') => {
                let child = rest.trim_end_matches(']').to_string();
                let entry = root
                    .entry(parent.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(children) = entry {
                    children.insert(child, value);
                }
            }
            _ => {
                root.insert(key.into_owned(), value);
            }
        }
    }

    Value::Object(root)
}

/// Accepts the timestamp formats eSIM Access has been seen to emit.
pub fn parse_provider_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.with_timezone(&Utc));
    }
    if let Ok(value) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(value.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Int(value)) => Some(value),
        Some(Scalar::Float(value)) => Some(value as i64),
        Some(Scalar::Text(value)) => value.trim().parse::<i64>().ok(),
        Some(Scalar::Bool(_)) | None => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Int(value)) => Some(value.to_string()),
        Some(Scalar::Float(value)) => Some(value.to_string()),
        Some(Scalar::Text(value)) if !value.trim().is_empty() => Some(value),
        Some(Scalar::Text(_)) | Some(Scalar::Bool(_)) | None => None,
    })
}
