use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Side effects published after the primary write succeeded. Consumers must treat
/// delivery as best effort: events can be dropped when the dispatch queue is full.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    PurchaseCompleted {
        user_id: Uuid,
        order_no: String,
        package_code: String,
        quantity: i32,
        discount_percent: Option<i32>,
    },
    EsimLowData {
        user_id: Uuid,
        order_no: String,
        iccid: Option<String>,
        remaining_volume: Option<i64>,
        total_volume: Option<i64>,
    },
    EsimExpiringSoon {
        user_id: Uuid,
        order_no: String,
        iccid: Option<String>,
        expired_time: Option<DateTime<Utc>>,
    },
}

impl AppEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AppEvent::PurchaseCompleted { .. } => "purchase_completed",
            AppEvent::EsimLowData { .. } => "esim_low_data",
            AppEvent::EsimExpiringSoon { .. } => "esim_expiring_soon",
        }
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            AppEvent::PurchaseCompleted { user_id, .. }
            | AppEvent::EsimLowData { user_id, .. }
            | AppEvent::EsimExpiringSoon { user_id, .. } => *user_id,
        }
    }
}
